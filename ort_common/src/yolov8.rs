use anyhow::{Context, bail};
use image::RgbImage;
use inference_common::bbox::BBox;
use inference_common::detection::Detection;
use inference_common::detector::Detector;
use inference_common::img_dimensions::ImgDimensions;
use inference_common::resize::FrameResizer;
use ndarray::CowArray;
use ort::session::Session;
use ort::value::TensorRef;

use crate::letterbox::Letterbox;
use crate::names;

/// Post-processing knobs for a YOLOv8 detector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YoloParams {
    /// Side of the square model input.
    pub input_size: u32,
    /// Minimum class score for a candidate box.
    pub conf_threshold: f32,
    /// Boxes of the same class overlapping more than this are suppressed.
    pub nms_threshold: f32,
    pub max_detections: usize,
}

impl Default for YoloParams {
    fn default() -> Self {
        Self {
            input_size: 640,
            conf_threshold: 0.25,
            nms_threshold: 0.45,
            max_detections: 300,
        }
    }
}

/// A box before class names are attached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub bbox: BBox,
    pub score: f32,
    pub class_idx: usize,
}

/// YOLOv8 ONNX model run through ort.
pub struct YoloV8 {
    session: Session,
    names: Vec<String>,
    params: YoloParams,
    resizer: FrameResizer,
}

impl YoloV8 {
    /// Wraps a loaded session. Class names come from the model's `names`
    /// metadata when present, COCO otherwise.
    pub fn new(session: Session, params: YoloParams) -> Self {
        let names = session
            .metadata()
            .ok()
            .and_then(|meta| meta.custom("names").ok().flatten())
            .and_then(|raw| names::parse_names(&raw));
        let names = match names {
            Some(names) => {
                log::info!("Model declares {} classes", names.len());
                names
            }
            None => {
                log::warn!("Model has no class names metadata, assuming COCO");
                names::coco_names()
            }
        };
        Self {
            session,
            names,
            params,
            resizer: FrameResizer::default(),
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    fn class_name(&self, idx: usize) -> String {
        self.names
            .get(idx)
            .cloned()
            .unwrap_or_else(|| format!("class{idx}"))
    }
}

impl Detector for YoloV8 {
    fn detect(&mut self, frame: &RgbImage) -> anyhow::Result<Vec<Detection>> {
        let dims = ImgDimensions::new(frame.width(), frame.height());
        let letterbox = Letterbox::new(dims, self.params.input_size);
        let input = letterbox.tensor(frame, &mut self.resizer)?;

        let input = CowArray::from(input).into_dyn();
        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(&input)?])
            .context("YOLOv8 forward pass failed")?;
        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .context("extracting YOLOv8 output")?;
        let shape: Vec<i64> = shape.iter().copied().collect();

        let candidates = decode(&shape, data, self.params.conf_threshold)?
            .into_iter()
            .map(|c| Candidate {
                bbox: letterbox
                    .unmap(c.bbox)
                    .clamp(dims.width as f32, dims.height as f32),
                ..c
            })
            .collect();
        drop(outputs);

        let kept = nms(candidates, self.params.nms_threshold, self.params.max_detections);
        Ok(kept
            .into_iter()
            .map(|c| Detection::new(c.bbox, c.score, self.class_name(c.class_idx)))
            .collect())
    }
}

/// Decodes a raw `[1, 4 + classes, anchors]` output (or its transpose) into
/// candidates at or above `conf_threshold`, in model-input coordinates.
pub fn decode(shape: &[i64], data: &[f32], conf_threshold: f32) -> anyhow::Result<Vec<Candidate>> {
    let &[1, a, b] = shape else {
        bail!("unexpected YOLOv8 output shape {shape:?}");
    };
    let (a, b) = (a as usize, b as usize);
    if data.len() != a * b {
        bail!("output has {} values, shape {shape:?} needs {}", data.len(), a * b);
    }
    // Anchors vastly outnumber attributes; use that to detect a transposed export.
    let transposed = a > b;
    let (attrs, anchors) = if transposed { (b, a) } else { (a, b) };
    if attrs <= 4 {
        bail!("YOLOv8 output has no class scores: {shape:?}");
    }
    let at = |attr: usize, anchor: usize| {
        if transposed {
            data[anchor * attrs + attr]
        } else {
            data[attr * anchors + anchor]
        }
    };

    let mut candidates = Vec::new();
    for anchor in 0..anchors {
        let (class_idx, score) = (4..attrs)
            .map(|attr| (attr - 4, at(attr, anchor)))
            .fold((0, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });
        if score < conf_threshold {
            continue;
        }
        candidates.push(Candidate {
            bbox: BBox::from_center(at(0, anchor), at(1, anchor), at(2, anchor), at(3, anchor)),
            score,
            class_idx,
        });
    }
    Ok(candidates)
}

/// Class-aware greedy non-maximum suppression, highest score first.
pub fn nms(mut candidates: Vec<Candidate>, iou_threshold: f32, max_detections: usize) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
    let mut kept: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        if kept.len() >= max_detections {
            break;
        }
        let suppressed = kept.iter().any(|k| {
            k.class_idx == candidate.class_idx && k.bbox.iou(&candidate.bbox) > iou_threshold
        });
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}
