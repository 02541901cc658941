use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};

use crate::{
    error::{MaskError, Result},
    labels::{self, LabelSet},
};

/// User-facing label groups.
#[derive(
    Debug, Clone, Copy,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
    PartialEq, Eq, Hash,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LabelGroup {
    Clothing,
    Body,
    Head,
}

impl LabelGroup {
    pub fn labels(self) -> &'static LabelSet {
        match self {
            Self::Clothing => labels::clothing(),
            Self::Body => labels::body(),
            Self::Head => labels::head(),
        }
    }

    /// Parse a group name, ignoring surrounding whitespace and case.
    pub fn from_name(name: &str) -> Result<Self> {
        name.trim()
            .to_lowercase()
            .parse()
            .map_err(|_| MaskError::UnknownGroup(name.to_string()))
    }
}

/// Union of the label sets of every named group.
pub fn resolve_groups<S: AsRef<str>>(names: &[S]) -> Result<LabelSet> {
    let mut resolved = LabelSet::new();
    for name in names {
        let group = LabelGroup::from_name(name.as_ref())?;
        resolved.extend_from(group.labels());
    }
    Ok(resolved)
}

/// A label selection as supplied by a caller: explicit ids and/or group names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Selection {
    #[schemars(description = "Explicit label ids")]
    pub labels: Option<Vec<u32>>,
    #[schemars(description = "Group names: any of ['clothing','body','head']")]
    pub groups: Option<Vec<String>>,
}

impl Selection {
    pub fn new(labels: Option<Vec<u32>>, groups: Option<Vec<String>>) -> Self {
        Self { labels, groups }
    }

    pub fn from_groups<S: Into<String>, I: IntoIterator<Item = S>>(groups: I) -> Self {
        Self::new(None, Some(groups.into_iter().map(Into::into).collect()))
    }

    pub fn from_labels<I: IntoIterator<Item = u32>>(labels: I) -> Self {
        Self::new(Some(labels.into_iter().collect()), None)
    }

    /// Resolve the selection as the inpainting target.
    ///
    /// An explicit label list, when present, replaces the groups entirely.
    /// The result must not be empty.
    pub fn resolve_target(&self) -> Result<LabelSet> {
        let target = match &self.labels {
            Some(ids) => ids.iter().copied().collect(),
            None => resolve_groups(self.groups.as_deref().unwrap_or_default())?,
        };

        if target.is_empty() {
            return Err(MaskError::NoTargetSelected);
        }
        Ok(target)
    }

    /// Resolve the selection as a protect list: explicit ids and groups are unioned.
    pub fn resolve_protect(&self) -> Result<LabelSet> {
        let mut protect: LabelSet = self.labels.iter().flatten().copied().collect();
        protect.extend_from(&resolve_groups(self.groups.as_deref().unwrap_or_default())?);
        Ok(protect)
    }
}
