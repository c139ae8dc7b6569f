pub mod heal;
pub mod reboot;
