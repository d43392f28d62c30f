pub mod annotate;
pub mod bbox;
pub mod coco_classes;
pub mod detection;
pub mod detector;
pub mod frame_meta;
pub mod frame_times;
pub mod img_dimensions;
pub mod media;
pub mod progress;
pub mod resize;
pub mod video_meta;
