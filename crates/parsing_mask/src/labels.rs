//! ATR human-parsing label taxonomy.
//!
//! Label ids are fixed by the parsing model that produces the maps: 18 classes,
//! ids `0..=17`. The three named groups (clothing, body, head) are built once
//! and shared read-only for the lifetime of the process.

use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr, VariantNames};

/// Number of classes produced by the ATR parsing model.
pub const NUM_CLASSES: usize = 18;

#[derive(
    Debug, Clone, Copy,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
    PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[repr(u8)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum Label {
    Background = 0,
    Hat = 1,
    Hair = 2,
    Sunglasses = 3,
    UpperClothes = 4,
    Skirt = 5,
    Pants = 6,
    Dress = 7,
    Belt = 8,
    LeftShoe = 9,
    RightShoe = 10,
    Face = 11,
    LeftLeg = 12,
    RightLeg = 13,
    LeftArm = 14,
    RightArm = 15,
    Bag = 16,
    Scarf = 17,
}

impl Label {
    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::iter().find(|label| label.id() == id)
    }
}

/// An unordered set of label ids.
///
/// Ids outside the taxonomy are allowed; they never match a pixel of a
/// parsing map produced by the model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct LabelSet(BTreeSet<u32>);

impl LabelSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_labels<I: IntoIterator<Item = Label>>(labels: I) -> Self {
        labels.into_iter().map(|label| label.id() as u32).collect()
    }

    pub fn insert(&mut self, id: u32) -> bool {
        self.0.insert(id)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.0.contains(&id)
    }

    pub fn contains_label(&self, label: Label) -> bool {
        self.contains(label.id() as u32)
    }

    pub fn union(&self, other: &LabelSet) -> LabelSet {
        self.0.union(&other.0).copied().collect()
    }

    pub fn extend_from(&mut self, other: &LabelSet) {
        self.0.extend(other.0.iter().copied());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }

    /// Per-sample membership table, indexed by the raw `u8` pixel value.
    pub(crate) fn lookup_table(&self) -> [bool; 256] {
        let mut table = [false; 256];
        for id in self.0.range(0..256) {
            table[*id as usize] = true;
        }
        table
    }
}

impl FromIterator<u32> for LabelSet {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a LabelSet {
    type Item = &'a u32;
    type IntoIter = std::collections::btree_set::Iter<'a, u32>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

static CLOTHING: LazyLock<LabelSet> = LazyLock::new(|| {
    LabelSet::from_labels([
        Label::UpperClothes,
        Label::Skirt,
        Label::Pants,
        Label::Dress,
        Label::Belt,
        Label::Bag,
        Label::Scarf,
    ])
});

static BODY: LazyLock<LabelSet> = LazyLock::new(|| {
    LabelSet::from_labels([Label::LeftArm, Label::RightArm, Label::LeftLeg, Label::RightLeg])
});

static HEAD: LazyLock<LabelSet> = LazyLock::new(|| {
    LabelSet::from_labels([Label::Face, Label::Hair, Label::Hat, Label::Sunglasses])
});

pub fn clothing() -> &'static LabelSet {
    &CLOTHING
}

pub fn body() -> &'static LabelSet {
    &BODY
}

pub fn head() -> &'static LabelSet {
    &HEAD
}

/// Every label that belongs to the person (clothing, body and head).
pub fn human() -> LabelSet {
    CLOTHING.union(&BODY).union(&HEAD)
}

/// Colour the parsing model assigns to a label id in its visualisations.
///
/// The bits of the id are spread over the three channels, starting from the
/// most significant bit of each channel.
pub fn palette_color(id: u8) -> [u8; 3] {
    let mut rgb = [0u8; 3];
    let mut lab = id;
    let mut bit = 0;
    while lab != 0 {
        for (channel, value) in rgb.iter_mut().enumerate() {
            *value |= ((lab >> channel) & 1) << (7 - bit);
        }
        bit += 1;
        lab >>= 3;
    }
    rgb
}

pub fn palette(num_classes: usize) -> Vec<[u8; 3]> {
    (0..num_classes.min(256)).map(|id| palette_color(id as u8)).collect()
}

static PALETTE_LOOKUP: LazyLock<HashMap<[u8; 3], u8>> =
    LazyLock::new(|| (0..=u8::MAX).map(|id| (palette_color(id), id)).collect());

/// Inverse of [`palette_color`].
pub fn label_for_color(rgb: [u8; 3]) -> Option<u8> {
    PALETTE_LOOKUP.get(&rgb).copied()
}
