pub mod certificate;
pub mod company;
pub mod cycle;
pub mod enums;
pub mod evidence;

pub use certificate::*;
pub use company::*;
pub use cycle::*;
pub use enums::*;
pub use evidence::*;
