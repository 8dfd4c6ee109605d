pub mod debcontrol;
pub mod pacparse;
