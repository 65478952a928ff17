use serde::{Deserialize, Serialize};

/// Selector as it arrives from a caller: a pacticipant name plus optional
/// qualifiers describing WHICH version of it to use. Selectors are built per
/// request and never stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnresolvedSelector {
    pub pacticipant_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pacticipant_version_number: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    /// Use the pacticipant's configured main branch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_branch: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_name: Option<String>,
}

/// The qualifier a selector resolves by, decided once by `UnresolvedSelector::kind`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SelectorKind {
    /// Exact version number
    Version(String),
    /// Head of the named branch
    Branch(String),
    /// Head of the pacticipant's configured main branch
    MainBranch,
    /// Newest version carrying the tag
    Tag(String),
    /// Version currently deployed or released to the environment
    Environment(String),
    /// Newest version overall
    Latest,
}

impl UnresolvedSelector {
    /// Create a selector for an exact version number
    pub fn for_version(pacticipant_name: &str, version_number: &str) -> Self {
        Self {
            pacticipant_name: pacticipant_name.to_string(),
            pacticipant_version_number: Some(version_number.to_string()),
            ..Self::default()
        }
    }

    /// Create a selector for the head of a branch
    pub fn for_branch(pacticipant_name: &str, branch: &str) -> Self {
        Self {
            pacticipant_name: pacticipant_name.to_string(),
            branch: Some(branch.to_string()),
            latest: Some(true),
            ..Self::default()
        }
    }

    /// Create a selector for the head of the configured main branch
    pub fn for_main_branch(pacticipant_name: &str) -> Self {
        Self {
            pacticipant_name: pacticipant_name.to_string(),
            main_branch: Some(true),
            latest: Some(true),
            ..Self::default()
        }
    }

    /// Create a selector for the newest version with a tag
    pub fn for_tag(pacticipant_name: &str, tag: &str) -> Self {
        Self {
            pacticipant_name: pacticipant_name.to_string(),
            tag: Some(tag.to_string()),
            latest: Some(true),
            ..Self::default()
        }
    }

    /// Create a selector for the version currently in an environment
    pub fn for_environment(pacticipant_name: &str, environment_name: &str) -> Self {
        Self {
            pacticipant_name: pacticipant_name.to_string(),
            environment_name: Some(environment_name.to_string()),
            latest: Some(true),
            ..Self::default()
        }
    }

    /// Create a selector for the newest version of a pacticipant
    pub fn for_latest(pacticipant_name: &str) -> Self {
        Self {
            pacticipant_name: pacticipant_name.to_string(),
            latest: Some(true),
            ..Self::default()
        }
    }

    /// Decide which qualifier this selector resolves by.
    ///
    /// An explicit version number wins over every other qualifier, `latest`
    /// included.
    pub fn kind(&self) -> SelectorKind {
        if let Some(number) = &self.pacticipant_version_number {
            return SelectorKind::Version(number.clone());
        }
        if let Some(branch) = &self.branch {
            return SelectorKind::Branch(branch.clone());
        }
        if self.main_branch == Some(true) {
            return SelectorKind::MainBranch;
        }
        if let Some(tag) = &self.tag {
            return SelectorKind::Tag(tag.clone());
        }
        if let Some(environment) = &self.environment_name {
            return SelectorKind::Environment(environment.clone());
        }
        SelectorKind::Latest
    }

    /// Validate the selector structure
    pub fn validate(&self) -> Result<(), String> {
        if self.pacticipant_name.trim().is_empty() {
            return Err("Selector must have a pacticipant_name".to_string());
        }
        if matches!(&self.pacticipant_version_number, Some(number) if number.trim().is_empty()) {
            return Err(format!(
                "Selector for {} has a blank pacticipant_version_number",
                self.pacticipant_name
            ));
        }
        if self.pacticipant_version_number.is_some() {
            // the version number decides, remaining qualifiers are ignored
            return Ok(());
        }

        let qualifiers = [
            self.branch.is_some(),
            self.main_branch == Some(true),
            self.tag.is_some(),
            self.environment_name.is_some(),
        ];
        if qualifiers.iter().filter(|set| **set).count() > 1 {
            return Err(format!(
                "Selector for {} may specify only one of branch, main_branch, tag or environment_name",
                self.pacticipant_name
            ));
        }
        Ok(())
    }

    /// Human-readable description used in logs and warnings
    pub fn description(&self) -> String {
        match self.kind() {
            SelectorKind::Version(number) => {
                format!("version {} of {}", number, self.pacticipant_name)
            }
            SelectorKind::Branch(branch) => format!(
                "the latest version of {} from branch {}",
                self.pacticipant_name, branch
            ),
            SelectorKind::MainBranch => format!(
                "the latest version of {} from its main branch",
                self.pacticipant_name
            ),
            SelectorKind::Tag(tag) => format!(
                "the latest version of {} with tag {}",
                self.pacticipant_name, tag
            ),
            SelectorKind::Environment(environment) => format!(
                "the version of {} currently in {}",
                self.pacticipant_name, environment
            ),
            SelectorKind::Latest => format!("the latest version of {}", self.pacticipant_name),
        }
    }
}
