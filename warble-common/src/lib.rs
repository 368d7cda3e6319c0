pub mod model;
pub mod scan;
pub mod snowflake;
pub mod util;
