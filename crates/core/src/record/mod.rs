mod json;
mod number;
mod value;

pub use json::{record_from_json, record_to_json};
pub use number::Number;
pub use value::{Record, Value};
