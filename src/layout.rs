use crate::captions::Slot;
use image::Rgba;

/// White foreground.
pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
/// Black at 40% opacity.
pub const GRAY40: Rgba<u8> = Rgba([0, 0, 0, 102]);

/// Placement constants for the prediction and caption overlays.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayLayout {
    /// Left edge of every overlay line.
    pub margin_x: i32,
    /// Top of the first prediction line.
    pub label_top: i32,
    /// Distance of each caption slot above the bottom of the block.
    pub top_offset: i32,
    pub middle_offset: i32,
    pub bottom_offset: i32,
    pub foreground: Rgba<u8>,
    pub background: Rgba<u8>,
}

impl Default for OverlayLayout {
    fn default() -> Self {
        Self {
            margin_x: 5,
            label_top: 5,
            top_offset: 44,
            middle_offset: 22,
            bottom_offset: 0,
            foreground: WHITE,
            background: GRAY40,
        }
    }
}

impl OverlayLayout {
    pub fn slot_offset(&self, slot: Slot) -> i32 {
        match slot {
            Slot::Top => self.top_offset,
            Slot::Middle => self.middle_offset,
            Slot::Bottom => self.bottom_offset,
        }
    }

    /// Top of the prediction line at `rank`.
    pub fn label_y(&self, rank: usize, line_height: u32) -> i32 {
        self.label_top + rank as i32 * line_height as i32
    }

    /// Top of a caption line for the prediction at `rank`.
    ///
    /// The caption block sits `predictions * line_height` above the bottom
    /// edge and each rank shifts it down by one line.
    pub fn caption_y(
        &self,
        frame_height: u32,
        predictions: usize,
        line_height: u32,
        slot: Slot,
        rank: usize,
    ) -> i32 {
        let line_height = line_height as i32;
        let block = predictions as i32 * line_height;
        frame_height as i32 - block - self.slot_offset(slot) + rank as i32 * line_height
    }
}
