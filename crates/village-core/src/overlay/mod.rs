pub mod countdown;
pub mod toast;
