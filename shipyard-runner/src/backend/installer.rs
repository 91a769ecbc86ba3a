//! Inno Setup installer backend

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use shipyard_core::domain::installer::InstallerSpec;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::InstallerBackend;
use crate::error::{PipelineError, Result};
use crate::installer_script;
use crate::process::ProcessCommand;

const COMPILE_TIMEOUT: Duration = Duration::from_secs(600);
const PROBE_TIMEOUT: Duration = Duration::from_secs(30);
const SIGN_TIMEOUT: Duration = Duration::from_secs(120);

const KNOWN_COMPILER_PATHS: &[&str] = &[
    r"C:\Program Files (x86)\Inno Setup 6\ISCC.exe",
    r"C:\Program Files\Inno Setup 6\ISCC.exe",
    r"C:\Program Files (x86)\Inno Setup 5\ISCC.exe",
    r"C:\Program Files\Inno Setup 5\ISCC.exe",
];

const KNOWN_SIGNTOOL_PATHS: &[&str] = &[
    r"C:\Program Files (x86)\Windows Kits\10\bin\10.0.19041.0\x64\signtool.exe",
    r"C:\Program Files (x86)\Windows Kits\10\bin\x64\signtool.exe",
    r"C:\Program Files\Microsoft SDKs\Windows\v7.1\Bin\signtool.exe",
];

/// Settings for the installer toolchain
#[derive(Debug, Clone)]
pub struct InnoSetupConfig {
    /// Explicit compiler location; searched for when absent
    pub compiler_path: Option<PathBuf>,
    /// Explicit signing tool location; searched for when absent
    pub sign_tool_path: Option<PathBuf>,
    pub timestamp_url: String,
}

impl Default for InnoSetupConfig {
    fn default() -> Self {
        Self {
            compiler_path: None,
            sign_tool_path: None,
            timestamp_url: "http://timestamp.digicert.com".to_string(),
        }
    }
}

/// [`InstallerBackend`] driving the Inno Setup command line compiler
pub struct InnoSetup {
    config: InnoSetupConfig,
}

impl InnoSetup {
    pub fn new(config: InnoSetupConfig) -> Self {
        Self { config }
    }

    /// Locates the compiler: configured path, known install dirs, then PATH
    pub fn find_compiler(&self) -> Option<PathBuf> {
        locate(
            self.config.compiler_path.as_deref(),
            KNOWN_COMPILER_PATHS,
            &["ISCC.exe", "iscc"],
        )
    }

    pub fn find_sign_tool(&self) -> Option<PathBuf> {
        locate(
            self.config.sign_tool_path.as_deref(),
            KNOWN_SIGNTOOL_PATHS,
            &["signtool.exe", "signtool"],
        )
    }

    /// The password is passed as a masked argument
    fn sign_command(
        &self,
        sign_tool: &Path,
        binary: &Path,
        certificate: &Path,
        password: &str,
    ) -> ProcessCommand {
        ProcessCommand::new(sign_tool.to_string_lossy())
            .arg("sign")
            .arg("/f")
            .arg(certificate.as_os_str())
            .arg("/p")
            .secret_arg(password)
            .arg("/t")
            .arg(self.config.timestamp_url.as_str())
            .arg(binary.as_os_str())
            .timeout(SIGN_TIMEOUT)
    }
}

/// First existing candidate among an explicit path, fixed paths and PATH
fn locate(explicit: Option<&Path>, known: &[&str], names: &[&str]) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    if let Some(path) = known.iter().map(PathBuf::from).find(|p| p.exists()) {
        return Some(path);
    }

    let search_path = std::env::var_os("PATH")?;
    std::env::split_paths(&search_path)
        .flat_map(|dir| names.iter().map(move |name| dir.join(name)))
        .find(|candidate| candidate.is_file())
}

/// Falls back to the first `.exe` in `<script dir>/Output`
fn find_in_output_dir(script_dir: &Path) -> Option<PathBuf> {
    let entries = std::fs::read_dir(script_dir.join("Output")).ok()?;
    entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .find(|path| {
            path.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("exe"))
        })
}

#[async_trait]
impl InstallerBackend for InnoSetup {
    async fn check_toolchain(&self, cancel: &CancellationToken) -> bool {
        let Some(compiler) = self.find_compiler() else {
            warn!("Inno Setup compiler not found");
            return false;
        };

        let probe = ProcessCommand::new(compiler.to_string_lossy())
            .arg("--version")
            .timeout(PROBE_TIMEOUT)
            .run(cancel)
            .await;

        match probe {
            Ok(output) if output.success() => {
                info!("Inno Setup is installed: {}", output.stdout_text().trim());
                true
            }
            Ok(output) => {
                error!("Inno Setup check failed: {}", output.stderr_text());
                false
            }
            Err(e) => {
                error!("Error checking Inno Setup installation: {}", e);
                false
            }
        }
    }

    fn generate_script(&self, spec: &InstallerSpec) -> String {
        info!(app = %spec.app_name, "generating installer script");
        let script = installer_script::render(spec);
        debug!("generated installer script:\n{}", script);
        script
    }

    async fn compile(
        &self,
        spec: &InstallerSpec,
        script: &str,
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        let compiler = self
            .find_compiler()
            .ok_or_else(|| PipelineError::ToolchainMissing("Inno Setup (ISCC)".to_string()))?;

        tokio::fs::create_dir_all(&spec.output_dir).await?;
        let script_path = spec.output_dir.join(spec.script_file_name());
        tokio::fs::write(&script_path, script).await?;
        info!(script = %script_path.display(), "saved installer script");

        let output = ProcessCommand::new(compiler.to_string_lossy())
            .arg(script_path.as_os_str())
            .timeout(COMPILE_TIMEOUT)
            .echo_output()
            .run_checked(cancel)
            .await?;

        if let Some(path) = installer_script::parse_output_filename(&output.stdout_text())
            .map(PathBuf::from)
            .filter(|p| p.exists())
        {
            info!(installer = %path.display(), "installer created");
            return Ok(path);
        }

        find_in_output_dir(&spec.output_dir).ok_or_else(|| PipelineError::Process {
            program: compiler.to_string_lossy().into_owned(),
            exit_code: output.exit_code,
            stderr: "compiler succeeded but produced no installer".to_string(),
        })
    }

    async fn sign(
        &self,
        binary: &Path,
        certificate: &Path,
        password: &str,
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        if !binary.exists() {
            return Err(PipelineError::MissingFile(binary.to_path_buf()));
        }
        if !certificate.exists() {
            return Err(PipelineError::MissingFile(certificate.to_path_buf()));
        }

        let sign_tool = self
            .find_sign_tool()
            .ok_or_else(|| PipelineError::ToolchainMissing("signtool".to_string()))?;

        info!(installer = %binary.display(), "signing installer");
        self.sign_command(&sign_tool, binary, certificate, password)
            .run_checked(cancel)
            .await?;

        Ok(binary.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_missing_compiler_is_not_found() {
        let backend = InnoSetup::new(InnoSetupConfig {
            compiler_path: Some(PathBuf::from("/definitely/missing/ISCC.exe")),
            ..Default::default()
        });
        assert!(backend.find_compiler().is_none());
    }

    #[test]
    fn test_explicit_compiler_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let compiler = dir.path().join("ISCC.exe");
        std::fs::write(&compiler, b"").unwrap();

        let backend = InnoSetup::new(InnoSetupConfig {
            compiler_path: Some(compiler.clone()),
            ..Default::default()
        });
        assert_eq!(backend.find_compiler(), Some(compiler));
    }

    #[test]
    fn test_output_dir_fallback() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_in_output_dir(dir.path()).is_none());

        let output = dir.path().join("Output");
        std::fs::create_dir(&output).unwrap();
        std::fs::write(output.join("readme.txt"), b"").unwrap();
        std::fs::write(output.join("MyApp_Setup.exe"), b"").unwrap();

        assert_eq!(
            find_in_output_dir(dir.path()),
            Some(output.join("MyApp_Setup.exe"))
        );
    }

    #[tokio::test]
    async fn test_missing_toolchain_reports_false() {
        let backend = InnoSetup::new(InnoSetupConfig {
            compiler_path: Some(PathBuf::from("/definitely/missing/ISCC.exe")),
            ..Default::default()
        });
        assert!(!backend.check_toolchain(&CancellationToken::new()).await);
    }

    #[tokio::test]
    async fn test_sign_requires_existing_files() {
        let backend = InnoSetup::new(InnoSetupConfig::default());
        let err = backend
            .sign(
                Path::new("/definitely/missing/setup.exe"),
                Path::new("/definitely/missing/cert.pfx"),
                "pw",
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::MissingFile(_)));
    }

    #[test]
    fn test_sign_command_masks_password() {
        let backend = InnoSetup::new(InnoSetupConfig::default());
        let cmd = backend.sign_command(
            Path::new("signtool.exe"),
            Path::new("setup.exe"),
            Path::new("cert.pfx"),
            "hunter2",
        );

        let shown = cmd.display_args();
        assert_eq!(shown[3], "/p");
        assert_eq!(shown[4], "****");
        assert!(!shown.iter().any(|a| a.contains("hunter2")));
        assert!(!format!("{cmd:?}").contains("hunter2"));
    }
}
