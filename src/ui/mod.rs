pub mod detail;
pub mod map;
pub mod panels;
pub mod table;
