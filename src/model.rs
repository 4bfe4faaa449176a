pub mod bounds;
pub mod options;
pub mod record;
