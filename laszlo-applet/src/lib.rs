//! OpenLaszlo applet helpers
//!
//! Build-system glue around the compiler: the `.lzx` to `.swf` build rule,
//! staleness checks for an applet's source tree, and the JavaScript
//! preprocessor applied when copying an applet's scripts.

pub mod applet;
pub mod rule;

pub use applet::{preprocess_string, Applet};
pub use rule::BuildRule;
