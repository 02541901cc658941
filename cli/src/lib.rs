use parsing_mask::{MaskParams, Selection};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JobConfigError {
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
    #[error(transparent)]
    TomlDeError(#[from] toml::de::Error),
    #[error(transparent)]
    TomlSerError(#[from] toml::ser::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error("Job file contains no jobs")]
    NoJobs,
    #[error("Job name must not be empty")]
    EmptyJobName,
    #[error("Duplicate job name '{0}'")]
    DuplicateJobName(String),
    #[error("Unsupported file format. Please use .toml or .json files")]
    UnsupportedFileFormat,
}

/// One parsing map to turn into a mask
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct MaskJob {
    /// Output file stem, the mask is written to `<output_dir>/<name>.png`
    pub name: String,
    pub input: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_labels: Option<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_groups: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protect_labels: Option<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protect_groups: Option<Vec<String>>,
}

impl MaskJob {
    pub fn target(&self) -> Selection {
        Selection::new(self.target_labels.clone(), self.target_groups.clone())
    }

    pub fn protect(&self) -> Selection {
        Selection::new(self.protect_labels.clone(), self.protect_groups.clone())
    }
}

/// Batch of mask jobs sharing an output directory and engine parameters
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct MaskJobFile {
    pub output_dir: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<MaskParams>,
    pub jobs: Vec<MaskJob>,
}

impl MaskJobFile {
    /// Load a job file from TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, JobConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, JobConfigError> {
        let file: MaskJobFile = toml::from_str(content)?;
        file.validate()?;
        Ok(file)
    }

    /// Load a job file from JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, JobConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, JobConfigError> {
        let file: MaskJobFile = serde_json::from_str(content)?;
        file.validate()?;
        Ok(file)
    }

    /// Auto-detect file format and load
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, JobConfigError> {
        let path_ref = path.as_ref();
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(JobConfigError::UnsupportedFileFormat),
        }
    }

    pub fn to_toml(&self) -> Result<String, JobConfigError> {
        Ok(toml::to_string_pretty(&self)?)
    }

    pub fn to_json(&self) -> Result<String, JobConfigError> {
        Ok(serde_json::to_string_pretty(&self)?)
    }

    /// Job names must be non-empty and unique, they become file names.
    pub fn validate(&self) -> Result<(), JobConfigError> {
        if self.jobs.is_empty() {
            return Err(JobConfigError::NoJobs);
        }
        let mut seen = HashSet::new();
        for job in &self.jobs {
            if job.name.trim().is_empty() {
                return Err(JobConfigError::EmptyJobName);
            }
            if !seen.insert(job.name.as_str()) {
                return Err(JobConfigError::DuplicateJobName(job.name.clone()));
            }
        }
        Ok(())
    }

    pub fn output_path(&self, job: &MaskJob) -> PathBuf {
        self.output_dir.join(format!("{}.png", job.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const TOML_JOBS: &str = r#"
output_dir = "masks"

[params]
corner_dilate = 5

[[jobs]]
name = "shirt"
input = "parsing/shirt.png"
target_groups = ["clothing"]
protect_groups = ["body"]

[[jobs]]
name = "arms"
input = "parsing/arms.png"
target_labels = [14, 15]
"#;

    #[test]
    fn test_from_toml() {
        let file = MaskJobFile::from_toml(TOML_JOBS).unwrap();
        assert_eq!(file.jobs.len(), 2);
        assert_eq!(file.output_path(&file.jobs[0]), PathBuf::from("masks/shirt.png"));

        let params = file.params.clone().unwrap();
        assert_eq!(params.corner_dilate, 5);
        assert_eq!(params.first_blur, MaskParams::default().first_blur);

        assert_eq!(file.jobs[0].target().resolve_target().unwrap(), *parsing_mask::labels::clothing());
        assert_eq!(file.jobs[1].target().resolve_target().unwrap().len(), 2);
        assert!(file.jobs[1].protect().resolve_protect().unwrap().is_empty());
    }

    #[test]
    fn test_json_roundtrip_through_files() {
        let file = MaskJobFile::from_toml(TOML_JOBS).unwrap();

        let mut json = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        json.write_all(file.to_json().unwrap().as_bytes()).unwrap();
        assert_eq!(MaskJobFile::from_file(json.path()).unwrap(), file);

        let mut toml = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        toml.write_all(file.to_toml().unwrap().as_bytes()).unwrap();
        assert_eq!(MaskJobFile::from_file(toml.path()).unwrap(), file);
    }

    #[test]
    fn test_unsupported_extension() {
        let yaml = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        assert!(matches!(
            MaskJobFile::from_file(yaml.path()),
            Err(JobConfigError::UnsupportedFileFormat)
        ));
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            MaskJobFile::from_json(r#"{"output_dir": "out", "jobs": []}"#),
            Err(JobConfigError::NoJobs)
        ));
        assert!(matches!(
            MaskJobFile::from_json(
                r#"{"output_dir": "out", "jobs": [
                    {"name": "a", "input": "a.png"},
                    {"name": "a", "input": "b.png"}
                ]}"#
            ),
            Err(JobConfigError::DuplicateJobName(name)) if name == "a"
        ));
        assert!(matches!(
            MaskJobFile::from_json(r#"{"output_dir": "out", "jobs": [{"name": " ", "input": "a.png"}]}"#),
            Err(JobConfigError::EmptyJobName)
        ));
    }
}
