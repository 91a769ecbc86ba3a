//! Desktop installer domain types
//!
//! Describes an Inno Setup based Windows installer. Field names follow the
//! directives they end up in so the generated script is easy to audit.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Installer definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallerSpec {
    pub app_name: String,
    pub app_version: String,
    pub publisher: String,
    pub publisher_url: Option<String>,
    pub support_url: Option<String>,
    pub updates_url: Option<String>,
    pub default_dir_name: String,
    pub default_group_name: String,
    pub output_dir: PathBuf,
    pub output_base_filename: String,
    pub setup_icon_file: Option<String>,
    pub license_file: Option<String>,
    pub info_before_file: Option<String>,
    pub info_after_file: Option<String>,
    pub compression: String,
    pub solid_compression: bool,
    pub create_uninstall_icon: bool,
    pub create_desktop_icon: bool,
    pub wizard_style: String,
    pub architectures: Vec<String>,
    /// Executable the start menu and desktop icons point to
    pub main_executable: String,
    pub files: Vec<InstallFile>,
    pub run: Vec<InstallRun>,
    pub icons: Vec<InstallIcon>,
    pub registry: Vec<RegistryEntry>,
    /// Replaces the default [Code] section when non-empty
    pub custom_sections: Vec<CustomSection>,
}

impl InstallerSpec {
    /// File name of the generated script, e.g. `My_App.iss`
    pub fn script_file_name(&self) -> String {
        format!("{}.iss", self.app_name.replace(' ', "_"))
    }
}

impl Default for InstallerSpec {
    fn default() -> Self {
        Self {
            app_name: "My Application".to_string(),
            app_version: "1.0.0".to_string(),
            publisher: "My Company".to_string(),
            publisher_url: Some("https://example.com".to_string()),
            support_url: None,
            updates_url: None,
            default_dir_name: "{autopf}\\MyApp".to_string(),
            default_group_name: "My Application".to_string(),
            output_dir: PathBuf::from("./Installer"),
            output_base_filename: "MyApp_Setup".to_string(),
            setup_icon_file: None,
            license_file: None,
            info_before_file: None,
            info_after_file: None,
            compression: "lzma2".to_string(),
            solid_compression: true,
            create_uninstall_icon: true,
            create_desktop_icon: true,
            wizard_style: "modern".to_string(),
            architectures: vec!["x64".to_string()],
            main_executable: "MyApp.exe".to_string(),
            files: Vec::new(),
            run: Vec::new(),
            icons: Vec::new(),
            registry: Vec::new(),
            custom_sections: Vec::new(),
        }
    }
}

/// A [Files] entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallFile {
    pub source: String,
    #[serde(default = "default_dest_dir")]
    pub dest_dir: String,
    #[serde(default = "default_file_flags")]
    pub flags: String,
    #[serde(default)]
    pub excludes: Vec<String>,
}

fn default_dest_dir() -> String {
    "{app}".to_string()
}

fn default_file_flags() -> String {
    "ignoreversion recursesubdirs createallsubdirs".to_string()
}

/// A [Run] entry executed after installation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallRun {
    pub filename: String,
    #[serde(default)]
    pub parameters: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_run_flags")]
    pub flags: String,
    #[serde(default)]
    pub check_return_code: bool,
}

fn default_run_flags() -> String {
    "postinstall nowait skipifsilent".to_string()
}

/// An extra [Icons] entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallIcon {
    pub name: String,
    pub filename: String,
    #[serde(default)]
    pub parameters: Option<String>,
    #[serde(default)]
    pub working_dir: Option<String>,
    #[serde(default)]
    pub icon_filename: Option<String>,
    #[serde(default)]
    pub icon_index: i32,
}

/// A [Registry] value written at install time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    /// Hive, e.g. `HKCU`
    pub root: String,
    pub subkey: String,
    #[serde(default = "default_value_type")]
    pub value_type: String,
    pub value_name: String,
    pub value_data: String,
}

fn default_value_type() -> String {
    "string".to_string()
}

/// A raw script section such as `[Code]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomSection {
    pub section: String,
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_file_name() {
        let spec = InstallerSpec {
            app_name: "My Enterprise Application".to_string(),
            ..Default::default()
        };
        assert_eq!(spec.script_file_name(), "My_Enterprise_Application.iss");
    }

    #[test]
    fn test_file_entry_defaults() {
        let file: InstallFile = serde_json::from_str(r#"{"source": "./publish/*"}"#).unwrap();
        assert_eq!(file.dest_dir, "{app}");
        assert!(file.flags.contains("recursesubdirs"));
        assert!(file.excludes.is_empty());
    }
}
