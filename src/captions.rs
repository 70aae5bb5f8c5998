//! Feeding guide shown under the predictions for the 21 bird classes the
//! network was trained on.

/// Vertical slot of a caption line inside the caption block at the bottom of
/// the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Top,
    Middle,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptionLine {
    pub text: &'static str,
    pub slot: Slot,
}

/// Line arrangement of a caption entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinePattern {
    /// Middle then bottom slot.
    TwoLine,
    /// Top, middle, then bottom slot.
    ThreeLine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptionEntry {
    /// Sentence printed to the console.
    pub summary: &'static str,
    /// Lines drawn onto the frame.
    pub lines: &'static [CaptionLine],
}

impl CaptionEntry {
    /// `None` when the entry's slots match neither known arrangement.
    pub fn pattern(&self) -> Option<LinePattern> {
        let slots: Vec<Slot> = self.lines.iter().map(|l| l.slot).collect();
        match slots.as_slice() {
            [Slot::Middle, Slot::Bottom] => Some(LinePattern::TwoLine),
            [Slot::Top, Slot::Middle, Slot::Bottom] => Some(LinePattern::ThreeLine),
            _ => None,
        }
    }
}

const fn top(text: &'static str) -> CaptionLine {
    CaptionLine {
        text,
        slot: Slot::Top,
    }
}

const fn mid(text: &'static str) -> CaptionLine {
    CaptionLine {
        text,
        slot: Slot::Middle,
    }
}

const fn bot(text: &'static str) -> CaptionLine {
    CaptionLine {
        text,
        slot: Slot::Bottom,
    }
}

pub const CAPTION_COUNT: usize = 21;

pub static CAPTIONS: [CaptionEntry; CAPTION_COUNT] = [
    // 0
    CaptionEntry {
        summary: "You can feed it fruits, grains, or insects",
        lines: &[mid("You can feed it fruits, grains,"), bot("or insects")],
    },
    // 1
    CaptionEntry {
        summary: "You can feed it seeds (Nyjer seed is a favorite), or sunflower hearts and chips",
        lines: &[
            top("You can feed it seeds"),
            mid("(Nyjer seed is a favorite), or"),
            bot("sunflower hearts and chips"),
        ],
    },
    // 2
    CaptionEntry {
        summary: "You can feed it earthworms, insects, berries, or fruits (raisins, chopped apples)",
        lines: &[
            top("You can feed it earthworms,"),
            mid("insects, berries, or fruits"),
            bot("(raisins, chopped apples)"),
        ],
    },
    // 3
    CaptionEntry {
        summary: "You can feed it insects, seeds, berries, suet, or peanut butter",
        lines: &[
            mid("You can feed it insects, seeds,"),
            bot("berries, suet, or peanut butter"),
        ],
    },
    // 4
    CaptionEntry {
        summary: "You can feed it seeds, peanuts, berries, or suet",
        lines: &[mid("You can feed it seeds, peanuts,"), bot("berries, or suet")],
    },
    // 5
    CaptionEntry {
        summary: "You can feed it seeds, suet, or insects",
        lines: &[mid("You can feed it seeds, suet,"), bot("or insects")],
    },
    // 6
    CaptionEntry {
        summary: "You can feed it seeds, or insects (its favorite food)",
        lines: &[
            mid("You can feed it seeds, or insects"),
            bot("(its favorite food)"),
        ],
    },
    // 7
    CaptionEntry {
        summary: "You can feed it insects, cracked corn, or seeds (millet, sunflower seeds...)",
        lines: &[
            top("You can feed it insects,"),
            mid("cracked corn, or seeds"),
            bot("(millet, sunflower seeds...)"),
        ],
    },
    // 8
    CaptionEntry {
        summary: "You can feed it insects, suet, berries, peanuts, or seeds (sunflower seeds)",
        lines: &[
            top("You can feed it insects, suet,"),
            mid("berries, peanuts, or seeds"),
            bot("(sunflower seeds)"),
        ],
    },
    // 9
    CaptionEntry {
        summary: "You can feed it suet, berries, or insects",
        lines: &[mid("You can feed it suet, berries,"), bot("or insects")],
    },
    // 10
    CaptionEntry {
        summary: "You can feed it suet, peanuts, berries, insects, nuts, or seeds (sunflower seeds)",
        lines: &[
            top("You can feed it suet, peanuts,"),
            mid("berries, insects, nuts, or seeds"),
            bot("(sunflower seeds)"),
        ],
    },
    // 11
    CaptionEntry {
        summary: "You can feed it buds, berries, or seeds (sunflower seeds, safflower seeds, nyjer seeds)",
        lines: &[
            top("You can feed it buds, berries,"),
            mid("or seeds (sunflower seeds,"),
            bot("safflower seeds, nyjer seeds)"),
        ],
    },
    // 12
    CaptionEntry {
        summary: "You can feed it grains, insects, cracked corn, or seeds (millet, sunflower seeds)",
        lines: &[
            top("You can feed it grains, insects,"),
            mid("cracked corn, or seeds"),
            bot("(millet, sunflower seeds)"),
        ],
    },
    // 13
    CaptionEntry {
        summary: "You can feed it insects, berries, seeds (sunflower seeds, safflower seed), grains, buds, or fruits",
        lines: &[
            top("You can feed it insects, berries,"),
            mid("seeds (sunflower seeds, safflower"),
            bot("seeds), grains, buds, or fruits"),
        ],
    },
    // 14
    CaptionEntry {
        summary: "You can feed it seeds (millet), peanuts, or grains (cracked corn)",
        lines: &[
            mid("You can feed it seeds (millet),"),
            bot("peanuts, or grains (cracked corn)"),
        ],
    },
    // 15
    CaptionEntry {
        summary: "You can feed it insects, berries, or seeds (sunflower seeds, nyjer seeds)",
        lines: &[
            mid("You can feed it insects, berries,"),
            bot("or seeds (sunflower & nyjer seeds)"),
        ],
    },
    // 16
    CaptionEntry {
        summary: "You can feed it insects, nuts, suet, or seeds (sunflower seeds)",
        lines: &[
            mid("You can feed it insects, nuts,"),
            bot("suet, or seeds (sunflower seeds)"),
        ],
    },
    // 17
    CaptionEntry {
        summary: "You can feed it seeds (sunflower seeds), fruits, berries, or insects",
        lines: &[
            top("You can feed it seeds"),
            mid("(sunflower seeds), fruits,"),
            bot("(berries, or insects"),
        ],
    },
    // 18
    CaptionEntry {
        summary: "You can feed it insects, seeds (sunflower seeds, millet), or cracked corn",
        lines: &[
            top("You can feed it insects, seeds"),
            mid("(sunflower seeds, millet),"),
            bot("or cracked corn"),
        ],
    },
    // 19
    CaptionEntry {
        summary: "You can feed it insects, suet, peanuts, or seeds (sunflower seeds)",
        lines: &[
            mid("You can feed it insects, suet,"),
            bot("peanuts, or seeds (sunflower seeds)"),
        ],
    },
    // 20
    CaptionEntry {
        summary: "You can feed it insects, suet, peanuts, or seeds (sunflower seeds)",
        lines: &[
            mid("You can feed it insects, suet,"),
            bot("peanuts, or seeds (sunflower seeds)"),
        ],
    },
];

/// Caption for `class_id`, or `None` outside 0..=20.
pub fn caption_for(class_id: u32) -> Option<&'static CaptionEntry> {
    CAPTIONS.get(class_id as usize)
}
