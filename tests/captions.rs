use imagenet_feeder::{caption_for, CaptionLine, LinePattern, OverlayLayout, Slot, CAPTIONS};

/// Summary, overlay lines and their slots for every class with a caption.
const EXPECTED_CAPTIONS: [(&str, &[(&str, Slot)]); 21] = [
    (
        "You can feed it fruits, grains, or insects",
        &[
            ("You can feed it fruits, grains,", Slot::Middle),
            ("or insects", Slot::Bottom),
        ],
    ),
    (
        "You can feed it seeds (Nyjer seed is a favorite), or sunflower hearts and chips",
        &[
            ("You can feed it seeds", Slot::Top),
            ("(Nyjer seed is a favorite), or", Slot::Middle),
            ("sunflower hearts and chips", Slot::Bottom),
        ],
    ),
    (
        "You can feed it earthworms, insects, berries, or fruits (raisins, chopped apples)",
        &[
            ("You can feed it earthworms,", Slot::Top),
            ("insects, berries, or fruits", Slot::Middle),
            ("(raisins, chopped apples)", Slot::Bottom),
        ],
    ),
    (
        "You can feed it insects, seeds, berries, suet, or peanut butter",
        &[
            ("You can feed it insects, seeds,", Slot::Middle),
            ("berries, suet, or peanut butter", Slot::Bottom),
        ],
    ),
    (
        "You can feed it seeds, peanuts, berries, or suet",
        &[
            ("You can feed it seeds, peanuts,", Slot::Middle),
            ("berries, or suet", Slot::Bottom),
        ],
    ),
    (
        "You can feed it seeds, suet, or insects",
        &[
            ("You can feed it seeds, suet,", Slot::Middle),
            ("or insects", Slot::Bottom),
        ],
    ),
    (
        "You can feed it seeds, or insects (its favorite food)",
        &[
            ("You can feed it seeds, or insects", Slot::Middle),
            ("(its favorite food)", Slot::Bottom),
        ],
    ),
    (
        "You can feed it insects, cracked corn, or seeds (millet, sunflower seeds...)",
        &[
            ("You can feed it insects,", Slot::Top),
            ("cracked corn, or seeds", Slot::Middle),
            ("(millet, sunflower seeds...)", Slot::Bottom),
        ],
    ),
    (
        "You can feed it insects, suet, berries, peanuts, or seeds (sunflower seeds)",
        &[
            ("You can feed it insects, suet,", Slot::Top),
            ("berries, peanuts, or seeds", Slot::Middle),
            ("(sunflower seeds)", Slot::Bottom),
        ],
    ),
    (
        "You can feed it suet, berries, or insects",
        &[
            ("You can feed it suet, berries,", Slot::Middle),
            ("or insects", Slot::Bottom),
        ],
    ),
    (
        "You can feed it suet, peanuts, berries, insects, nuts, or seeds (sunflower seeds)",
        &[
            ("You can feed it suet, peanuts,", Slot::Top),
            ("berries, insects, nuts, or seeds", Slot::Middle),
            ("(sunflower seeds)", Slot::Bottom),
        ],
    ),
    (
        "You can feed it buds, berries, or seeds (sunflower seeds, safflower seeds, nyjer seeds)",
        &[
            ("You can feed it buds, berries,", Slot::Top),
            ("or seeds (sunflower seeds,", Slot::Middle),
            ("safflower seeds, nyjer seeds)", Slot::Bottom),
        ],
    ),
    (
        "You can feed it grains, insects, cracked corn, or seeds (millet, sunflower seeds)",
        &[
            ("You can feed it grains, insects,", Slot::Top),
            ("cracked corn, or seeds", Slot::Middle),
            ("(millet, sunflower seeds)", Slot::Bottom),
        ],
    ),
    (
        "You can feed it insects, berries, seeds (sunflower seeds, safflower seed), grains, buds, or fruits",
        &[
            ("You can feed it insects, berries,", Slot::Top),
            ("seeds (sunflower seeds, safflower", Slot::Middle),
            ("seeds), grains, buds, or fruits", Slot::Bottom),
        ],
    ),
    (
        "You can feed it seeds (millet), peanuts, or grains (cracked corn)",
        &[
            ("You can feed it seeds (millet),", Slot::Middle),
            ("peanuts, or grains (cracked corn)", Slot::Bottom),
        ],
    ),
    (
        "You can feed it insects, berries, or seeds (sunflower seeds, nyjer seeds)",
        &[
            ("You can feed it insects, berries,", Slot::Middle),
            ("or seeds (sunflower & nyjer seeds)", Slot::Bottom),
        ],
    ),
    (
        "You can feed it insects, nuts, suet, or seeds (sunflower seeds)",
        &[
            ("You can feed it insects, nuts,", Slot::Middle),
            ("suet, or seeds (sunflower seeds)", Slot::Bottom),
        ],
    ),
    (
        "You can feed it seeds (sunflower seeds), fruits, berries, or insects",
        &[
            ("You can feed it seeds", Slot::Top),
            ("(sunflower seeds), fruits,", Slot::Middle),
            ("(berries, or insects", Slot::Bottom),
        ],
    ),
    (
        "You can feed it insects, seeds (sunflower seeds, millet), or cracked corn",
        &[
            ("You can feed it insects, seeds", Slot::Top),
            ("(sunflower seeds, millet),", Slot::Middle),
            ("or cracked corn", Slot::Bottom),
        ],
    ),
    (
        "You can feed it insects, suet, peanuts, or seeds (sunflower seeds)",
        &[
            ("You can feed it insects, suet,", Slot::Middle),
            ("peanuts, or seeds (sunflower seeds)", Slot::Bottom),
        ],
    ),
    (
        "You can feed it insects, suet, peanuts, or seeds (sunflower seeds)",
        &[
            ("You can feed it insects, suet,", Slot::Middle),
            ("peanuts, or seeds (sunflower seeds)", Slot::Bottom),
        ],
    ),
];

fn texts(id: u32) -> Vec<&'static str> {
    caption_for(id).unwrap().lines.iter().map(|l| l.text).collect()
}

#[test]
fn every_class_has_a_known_line_pattern() {
    for (id, entry) in CAPTIONS.iter().enumerate() {
        assert!(
            entry.pattern().is_some(),
            "class {id} has an unexpected slot arrangement: {:?}",
            entry.lines
        );
        assert!(entry.summary.starts_with("You can feed it"), "class {id}");
    }
}

#[test]
fn three_line_and_two_line_classes() {
    let three: Vec<u32> = (0..21)
        .filter(|id| caption_for(*id).unwrap().pattern() == Some(LinePattern::ThreeLine))
        .collect();
    assert_eq!(three, [1, 2, 7, 8, 10, 11, 12, 13, 17, 18]);
    let two: Vec<u32> = (0..21)
        .filter(|id| caption_for(*id).unwrap().pattern() == Some(LinePattern::TwoLine))
        .collect();
    assert_eq!(two, [0, 3, 4, 5, 6, 9, 14, 15, 16, 19, 20]);
}

#[test]
fn out_of_range_classes_have_no_caption() {
    assert!(caption_for(21).is_none());
    assert!(caption_for(999).is_none());
    assert!(caption_for(u32::MAX).is_none());
}

#[test]
fn every_caption_matches_its_literal_text() {
    assert_eq!(CAPTIONS.len(), EXPECTED_CAPTIONS.len());
    for (id, (summary, lines)) in EXPECTED_CAPTIONS.iter().enumerate() {
        let entry = caption_for(id as u32).unwrap();
        assert_eq!(entry.summary, *summary, "summary of class {id}");
        let actual: Vec<(&str, Slot)> = entry.lines.iter().map(|l| (l.text, l.slot)).collect();
        assert_eq!(actual, *lines, "lines of class {id}");
    }
}

#[test]
fn stray_parenthesis_is_kept() {
    assert_eq!(texts(17)[2], "(berries, or insects");
}

#[test]
fn last_two_classes_share_their_caption() {
    assert_eq!(caption_for(19), caption_for(20));
}

#[test]
fn slots_of_a_three_line_caption() {
    let lines = caption_for(7).unwrap().lines;
    assert_eq!(
        lines,
        [
            CaptionLine { text: "You can feed it insects,", slot: Slot::Top },
            CaptionLine { text: "cracked corn, or seeds", slot: Slot::Middle },
            CaptionLine { text: "(millet, sunflower seeds...)", slot: Slot::Bottom },
        ]
    );
}

#[test]
fn caption_geometry() {
    let layout = OverlayLayout::default();
    // two predictions on a 720 line frame with 16 pixel lines
    assert_eq!(layout.caption_y(720, 2, 16, Slot::Top, 0), 720 - 32 - 44);
    assert_eq!(layout.caption_y(720, 2, 16, Slot::Middle, 0), 720 - 32 - 22);
    assert_eq!(layout.caption_y(720, 2, 16, Slot::Bottom, 0), 720 - 32);
    assert_eq!(layout.caption_y(720, 2, 16, Slot::Bottom, 1), 720 - 32 + 16);
    assert_eq!(layout.label_y(0, 16), 5);
    assert_eq!(layout.label_y(3, 16), 5 + 48);
}

#[test]
fn caption_geometry_can_leave_the_frame() {
    let layout = OverlayLayout::default();
    assert!(layout.caption_y(20, 3, 16, Slot::Top, 0) < 0);
}
