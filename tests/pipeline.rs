use anyhow::{bail, Result};
use image::{Rgba, RgbImage};
use imagenet_feeder::{
    annotate, format_percent, Classifier, Frame, LoopState, OverlayLayout, Pipeline, Prediction,
    Step, TextOverlay, VideoOutput, VideoSource,
};
use proptest::prelude::*;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

const FRAME_HEIGHT: u32 = 100;
const LINE: u32 = 16;

fn frame(index: u64) -> Frame {
    Frame::new(RgbImage::new(64, FRAME_HEIGHT), index)
}

/// Yields the scripted captures and stops streaming once they run out.
struct ScriptedSource {
    script: VecDeque<Option<Frame>>,
    captures: usize,
    stop_when_empty: bool,
}

impl ScriptedSource {
    fn frames(count: u64) -> Self {
        Self::new((0..count).map(|i| Some(frame(i))).collect())
    }

    fn new(script: Vec<Option<Frame>>) -> Self {
        Self {
            script: script.into(),
            captures: 0,
            stop_when_empty: true,
        }
    }
}

impl VideoSource for ScriptedSource {
    fn capture(&mut self) -> Result<Option<Frame>> {
        self.captures += 1;
        Ok(self.script.pop_front().flatten())
    }

    fn is_streaming(&self) -> bool {
        !(self.stop_when_empty && self.script.is_empty())
    }
}

#[derive(Default)]
struct RecordingOutput {
    rendered: Vec<u64>,
    statuses: Vec<String>,
    stop_after: Option<usize>,
}

impl VideoOutput for RecordingOutput {
    fn render(&mut self, frame: &Frame) -> Result<()> {
        self.rendered.push(frame.index());
        Ok(())
    }

    fn set_status(&mut self, status: &str) {
        self.statuses.push(status.to_string());
    }

    fn is_streaming(&self) -> bool {
        self.stop_after.map_or(true, |n| self.rendered.len() < n)
    }
}

struct FixedClassifier {
    predictions: Vec<Prediction>,
    classified: usize,
    profiled: Cell<usize>,
    fail: bool,
}

impl FixedClassifier {
    fn new(predictions: Vec<Prediction>) -> Self {
        Self {
            predictions,
            classified: 0,
            profiled: Cell::new(0),
            fail: false,
        }
    }
}

impl Classifier for FixedClassifier {
    fn classify(&mut self, _frame: &Frame, top_k: usize) -> Result<Vec<Prediction>> {
        if self.fail {
            bail!("inference failed");
        }
        self.classified += 1;
        Ok(self.predictions.iter().take(top_k).copied().collect())
    }

    fn class_label(&self, class_id: u32) -> Option<&str> {
        match class_id {
            1 => Some("goldfinch"),
            7 => Some("sparrow"),
            25 => Some("pigeon"),
            _ => None,
        }
    }

    fn num_classes(&self) -> usize {
        30
    }

    fn network_name(&self) -> &str {
        "birds"
    }

    fn network_fps(&self) -> f32 {
        119.6
    }

    fn print_profiler_times(&self) {
        self.profiled.set(self.profiled.get() + 1);
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Drawn {
    text: String,
    x: i32,
    y: i32,
}

#[derive(Default)]
struct RecordingFont {
    drawn: RefCell<Vec<Drawn>>,
}

impl TextOverlay for RecordingFont {
    fn overlay(
        &self,
        _frame: &mut Frame,
        text: &str,
        x: i32,
        y: i32,
        _foreground: Rgba<u8>,
        _background: Rgba<u8>,
    ) -> Result<()> {
        self.drawn.borrow_mut().push(Drawn {
            text: text.to_string(),
            x,
            y,
        });
        Ok(())
    }

    fn line_height(&self) -> u32 {
        LINE
    }
}

fn drawn(text: &str, x: i32, y: i32) -> Drawn {
    Drawn {
        text: text.to_string(),
        x,
        y,
    }
}

fn fixture() -> Vec<Prediction> {
    vec![
        Prediction::new(1, 0.75),
        Prediction::new(25, 0.2),
        Prediction::new(7, 0.05),
    ]
}

#[test]
fn three_frames_then_end_of_stream() {
    let mut pipeline = Pipeline::new(
        ScriptedSource::frames(3),
        RecordingOutput::default(),
        FixedClassifier::new(fixture()),
        RecordingFont::default(),
        2,
    );
    let mut console = Vec::new();
    let frames = pipeline.run(&mut console).unwrap();
    assert_eq!(frames, 3);
    assert_eq!(pipeline.state(), LoopState::Stopped);

    let (source, output, net, font) = pipeline.into_parts();
    assert_eq!(source.captures, 3);
    assert_eq!(output.rendered, [0, 1, 2]);
    assert_eq!(output.statuses, vec!["birds | Network 120 FPS"; 3]);
    assert_eq!(net.classified, 3);
    assert_eq!(net.profiled.get(), 3);

    // two predictions, a 32 pixel block above the bottom edge
    let block = FRAME_HEIGHT as i32 - 2 * LINE as i32;
    let per_frame = vec![
        drawn("You can feed it seeds", 5, block - 44),
        drawn("(Nyjer seed is a favorite), or", 5, block - 22),
        drawn("sunflower hearts and chips", 5, block),
        drawn("75.00% goldfinch, ", 5, 5),
        drawn("20.00% pigeon, ", 5, 5 + LINE as i32),
    ];
    let expected: Vec<Drawn> = per_frame.iter().cloned().cycle().take(15).collect();
    assert_eq!(*font.drawn.borrow(), expected);

    let text = String::from_utf8(console).unwrap();
    let per_frame = "imagenet:  75.00% class #1 (goldfinch)\n\
                     You can feed it seeds (Nyjer seed is a favorite), or sunflower hearts and chips\n\
                     imagenet:  20.00% class #25 (pigeon)\n";
    assert_eq!(text, per_frame.repeat(3));
}

#[test]
fn caption_moves_down_with_rank() {
    let predictions = [Prediction::new(25, 0.6), Prediction::new(0, 0.3)];
    let net = FixedClassifier::new(Vec::new());
    let font = RecordingFont::default();
    let mut console = Vec::new();
    let mut f = frame(0);
    annotate(
        &mut f,
        &predictions,
        &net,
        &font,
        &OverlayLayout::default(),
        &mut console,
    )
    .unwrap();
    let block = FRAME_HEIGHT as i32 - 2 * LINE as i32;
    assert_eq!(
        *font.drawn.borrow(),
        [
            drawn("60.00% pigeon, ", 5, 5),
            drawn("You can feed it fruits, grains,", 5, block - 22 + LINE as i32),
            drawn("or insects", 5, block + LINE as i32),
            drawn("30.00% , ", 5, 5 + LINE as i32),
        ]
    );
    let text = String::from_utf8(console).unwrap();
    assert!(text.contains("imagenet:  30.00% class #0 ()\n"));
}

#[test]
fn null_frame_is_skipped_without_side_effects() {
    let mut source = ScriptedSource::new(vec![None, Some(frame(0)), Some(frame(1))]);
    source.stop_when_empty = true;
    let mut pipeline = Pipeline::new(
        source,
        RecordingOutput::default(),
        FixedClassifier::new(fixture()),
        RecordingFont::default(),
        1,
    );
    let mut console = Vec::new();
    assert_eq!(pipeline.step(&mut console).unwrap(), Step::Skipped);
    assert_eq!(pipeline.state(), LoopState::Running);
    assert!(console.is_empty());
    assert_eq!(pipeline.rendered(), 0);
    assert!(pipeline.output().statuses.is_empty());
    assert_eq!(pipeline.classifier().classified, 0);
    assert_eq!(pipeline.classifier().profiled.get(), 0);

    assert_eq!(
        pipeline.step(&mut console).unwrap(),
        Step::Rendered { predictions: 1 }
    );
    pipeline.run(&mut console).unwrap();
    assert_eq!(pipeline.rendered(), 2);
    assert_eq!(pipeline.source().captures, 3);
}

#[test]
fn repeated_timeouts_keep_running() {
    let mut source = ScriptedSource::new((0..5).map(|_| None).collect());
    source.stop_when_empty = false;
    let mut pipeline = Pipeline::new(
        source,
        RecordingOutput::default(),
        FixedClassifier::new(fixture()),
        RecordingFont::default(),
        1,
    );
    let mut console = Vec::new();
    for _ in 0..10 {
        assert_eq!(pipeline.step(&mut console).unwrap(), Step::Skipped);
    }
    assert_eq!(pipeline.state(), LoopState::Running);
    assert!(pipeline.output().rendered.is_empty());
}

#[test]
fn exhausted_source_stops_on_timeout() {
    let source = ScriptedSource::new(vec![None]);
    let mut pipeline = Pipeline::new(
        source,
        RecordingOutput::default(),
        FixedClassifier::new(fixture()),
        RecordingFont::default(),
        1,
    );
    let mut console = Vec::new();
    assert_eq!(pipeline.run(&mut console).unwrap(), 0);
    assert_eq!(pipeline.state(), LoopState::Stopped);
    assert_eq!(pipeline.source().captures, 1);
}

#[test]
fn closed_output_stops_the_loop() {
    let output = RecordingOutput {
        stop_after: Some(2),
        ..Default::default()
    };
    let mut pipeline = Pipeline::new(
        ScriptedSource::frames(10),
        output,
        FixedClassifier::new(fixture()),
        RecordingFont::default(),
        1,
    );
    let mut console = Vec::new();
    assert_eq!(pipeline.run(&mut console).unwrap(), 2);
    assert_eq!(pipeline.source().captures, 2);
}

#[test]
fn stopped_pipeline_does_not_capture() {
    let mut pipeline = Pipeline::new(
        ScriptedSource::frames(1),
        RecordingOutput::default(),
        FixedClassifier::new(fixture()),
        RecordingFont::default(),
        1,
    );
    let mut console = Vec::new();
    pipeline.run(&mut console).unwrap();
    assert_eq!(pipeline.step(&mut console).unwrap(), Step::Skipped);
    assert_eq!(pipeline.source().captures, 1);
}

#[test]
fn classifier_failure_is_fatal() {
    let mut net = FixedClassifier::new(fixture());
    net.fail = true;
    let mut pipeline = Pipeline::new(
        ScriptedSource::frames(3),
        RecordingOutput::default(),
        net,
        RecordingFont::default(),
        1,
    );
    let mut console = Vec::new();
    let err = pipeline.run(&mut console).unwrap_err();
    assert!(err.to_string().contains("inference failed"));
    assert!(pipeline.output().rendered.is_empty());
}

#[test]
fn percent_formatting() {
    assert_eq!(format_percent(0.05), "05.00");
    assert_eq!(format_percent(0.0), "00.00");
    assert_eq!(format_percent(0.123456), "12.35");
    assert_eq!(format_percent(1.0), "100.00");
}

proptest! {
    #[test]
    fn percent_has_two_decimals(confidence in 0.0f32..=1.0) {
        let text = format_percent(confidence);
        prop_assert!(text.len() >= 5);
        let (_, decimals) = text.split_once('.').unwrap();
        prop_assert_eq!(decimals.len(), 2);
        let value: f32 = text.parse().unwrap();
        prop_assert!((value - confidence * 100.0).abs() <= 0.0051);
    }

    #[test]
    fn one_label_line_per_prediction(top_k in 0usize..6) {
        let mut pipeline = Pipeline::new(
            ScriptedSource::frames(1),
            RecordingOutput::default(),
            FixedClassifier::new(fixture()),
            RecordingFont::default(),
            top_k,
        );
        let mut console = Vec::new();
        pipeline.run(&mut console).unwrap();
        let (_, _, _, font) = pipeline.into_parts();
        let labels: Vec<i32> = font
            .drawn
            .borrow()
            .iter()
            .filter(|d| d.text.ends_with(", ") && d.text.contains('%'))
            .map(|d| d.y)
            .collect();
        let expected = top_k.min(fixture().len());
        prop_assert_eq!(labels.len(), expected);
        let ys: Vec<i32> = (0..expected).map(|n| 5 + n as i32 * LINE as i32).collect();
        prop_assert_eq!(labels, ys);
    }
}
