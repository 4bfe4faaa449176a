use ord_subset::OrdSubsetIterExt;

/// Session-wide elevation range. Only ever widens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeightBounds {
	pub min: f64,
	pub max: f64,
}

impl HeightBounds {
	pub fn new(min: f64, max: f64) -> HeightBounds {
		HeightBounds { min, max }
	}

	pub fn merge(self, new_min: f64, new_max: f64) -> HeightBounds {
		HeightBounds {
			min: self.min.min(new_min),
			max: self.max.max(new_max),
		}
	}

	pub fn merge_bounds(self, other: HeightBounds) -> HeightBounds {
		self.merge(other.min, other.max)
	}

	pub fn contains(&self, z: f64) -> bool {
		z >= self.min && z <= self.max
	}

	pub fn span(&self) -> f64 {
		self.max - self.min
	}
}

/// Extrema of `values`, ignoring NaN. `None` when nothing comparable is left.
pub fn find_height_bounds(values: &[f64]) -> Option<HeightBounds> {
	let min = *values.iter().ord_subset_min()?;
	let max = *values.iter().ord_subset_max()?;
	Some(HeightBounds::new(min, max))
}

/// Folds an optional running range with a new one.
pub fn merge_into(current: Option<HeightBounds>, new: HeightBounds) -> HeightBounds {
	match current {
		Some(bounds) => bounds.merge_bounds(new),
		None => new,
	}
}
