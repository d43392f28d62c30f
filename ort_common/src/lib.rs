pub mod letterbox;
pub mod names;
pub mod yolov8;
