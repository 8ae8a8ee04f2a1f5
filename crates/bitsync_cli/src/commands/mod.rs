pub(crate) mod reset;
pub(crate) mod start;
