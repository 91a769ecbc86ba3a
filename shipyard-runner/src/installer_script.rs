//! Inno Setup script generation
//!
//! Pure rendering of an [`InstallerSpec`] into `.iss` text. Sections are
//! emitted in a fixed order; optional directives are left out entirely
//! rather than written empty.

use shipyard_core::domain::installer::InstallerSpec;

/// [Code] section used when the installer brings no custom sections
const DEFAULT_CODE_SECTION: &str = r#"[Code]
function InitializeSetup(): Boolean;
var
  ErrorCode: Integer;
  NetFrameworkInstalled: Boolean;
begin
  NetFrameworkInstalled := RegKeyExists(HKLM, 'SOFTWARE\Microsoft\NET Framework Setup\NDP\v4\Full');
  if not NetFrameworkInstalled then
  begin
    if MsgBox('This application requires Microsoft .NET Framework 4.8.' + #13#10 +
              'Do you want to download and install it now?',
              mbConfirmation, MB_YESNO) = IDYES then
    begin
      ShellExec('open',
                'https://dotnet.microsoft.com/download/dotnet-framework/thank-you/net48-web-installer',
                '', '', SW_SHOWNORMAL, ewNoWait, ErrorCode);
    end;
    Result := False;
  end
  else
    Result := True;
end;

procedure CurStepChanged(CurStep: TSetupStep);
begin
  if CurStep = ssPostInstall then
  begin
    ForceDirectories(ExpandConstant('{app}\Backups'));
    ForceDirectories(ExpandConstant('{app}\Logs'));
    ForceDirectories(ExpandConstant('{app}\Exports'));
  end;
end;

function CheckReturnCode(Param: String): Boolean;
begin
  Result := True;
end;
"#;

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

/// Renders the complete installer script
pub fn render(spec: &InstallerSpec) -> String {
    let mut out = Vec::new();

    // [Setup]
    out.push("[Setup]".to_string());
    out.push(format!("AppName={}", spec.app_name));
    out.push(format!("AppVersion={}", spec.app_version));
    out.push(format!("AppPublisher={}", spec.publisher));
    let optional_urls = [
        ("AppPublisherURL", &spec.publisher_url),
        ("AppSupportURL", &spec.support_url),
        ("AppUpdatesURL", &spec.updates_url),
    ];
    for (directive, value) in optional_urls {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            out.push(format!("{directive}={value}"));
        }
    }
    out.push(format!("DefaultDirName={}", spec.default_dir_name));
    out.push(format!("DefaultGroupName={}", spec.default_group_name));
    out.push(format!("OutputDir={}", spec.output_dir.display()));
    out.push(format!("OutputBaseFilename={}", spec.output_base_filename));
    let optional_files = [
        ("SetupIconFile", &spec.setup_icon_file),
        ("LicenseFile", &spec.license_file),
        ("InfoBeforeFile", &spec.info_before_file),
        ("InfoAfterFile", &spec.info_after_file),
    ];
    for (directive, value) in optional_files {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            out.push(format!("{directive}={value}"));
        }
    }
    out.push(format!("Compression={}", spec.compression));
    out.push(format!("SolidCompression={}", yes_no(spec.solid_compression)));
    out.push(format!("WizardStyle={}", spec.wizard_style));
    if !spec.architectures.is_empty() {
        out.push(format!(
            "ArchitecturesInstallIn64BitMode={}",
            spec.architectures.join(" ")
        ));
    }
    out.push(String::new());

    // [Languages]
    out.push("[Languages]".to_string());
    out.push(r#"Name: "english"; MessagesFile: "compiler:Default.isl""#.to_string());
    out.push(String::new());

    // [Tasks]
    out.push("[Tasks]".to_string());
    out.push(
        r#"Name: "desktopicon"; Description: "{cm:CreateDesktopIcon}"; GroupDescription: "{cm:AdditionalIcons}"; Flags: unchecked"#
            .to_string(),
    );
    out.push(
        r#"Name: "quicklaunchicon"; Description: "{cm:CreateQuickLaunchIcon}"; GroupDescription: "{cm:AdditionalIcons}"; Flags: unchecked; OnlyBelowVersion: 0,6.1"#
            .to_string(),
    );
    out.push(String::new());

    // [Files]
    out.push("[Files]".to_string());
    for file in &spec.files {
        if file.excludes.is_empty() {
            out.push(format!(
                r#"Source: "{}"; DestDir: "{}"; Flags: {}"#,
                file.source, file.dest_dir, file.flags
            ));
        } else {
            for exclude in &file.excludes {
                out.push(format!(
                    r#"Source: "{}\{}"; DestDir: "{}"; Flags: {} ignoreversion deleteafterinstall"#,
                    file.source, exclude, file.dest_dir, file.flags
                ));
            }
        }
    }
    out.push(String::new());

    // [Icons]
    out.push("[Icons]".to_string());
    out.push(format!(
        r#"Name: "{{group}}\{}"; Filename: "{{app}}\{}""#,
        spec.app_name, spec.main_executable
    ));
    if spec.create_uninstall_icon {
        out.push(format!(
            r#"Name: "{{group}}\{{cm:UninstallProgram,{}}}"; Filename: "{{uninstallexe}}""#,
            spec.app_name
        ));
    }
    if spec.create_desktop_icon {
        out.push(format!(
            r#"Name: "{{commondesktop}}\{}"; Filename: "{{app}}\{}"; Tasks: desktopicon"#,
            spec.app_name, spec.main_executable
        ));
    }
    for icon in &spec.icons {
        let mut line = format!(r#"Name: "{}"; Filename: "{}""#, icon.name, icon.filename);
        if let Some(parameters) = icon.parameters.as_deref().filter(|v| !v.is_empty()) {
            line.push_str(&format!(r#"; Parameters: "{parameters}""#));
        }
        if let Some(dir) = icon.working_dir.as_deref().filter(|v| !v.is_empty()) {
            line.push_str(&format!(r#"; WorkingDir: "{dir}""#));
        }
        if let Some(icon_file) = icon.icon_filename.as_deref().filter(|v| !v.is_empty()) {
            line.push_str(&format!(r#"; IconFilename: "{icon_file}""#));
        }
        if icon.icon_index != 0 {
            line.push_str(&format!("; IconIndex: {}", icon.icon_index));
        }
        out.push(line);
    }
    out.push(String::new());

    // [Run]
    if !spec.run.is_empty() {
        out.push("[Run]".to_string());
        for run in &spec.run {
            let mut line = format!(r#"Filename: "{}""#, run.filename);
            if let Some(parameters) = run.parameters.as_deref().filter(|v| !v.is_empty()) {
                line.push_str(&format!(r#"; Parameters: "{parameters}""#));
            }
            if let Some(description) = run.description.as_deref().filter(|v| !v.is_empty()) {
                line.push_str(&format!(r#"; Description: "{description}""#));
            }
            if !run.flags.is_empty() {
                line.push_str(&format!("; Flags: {}", run.flags));
            }
            if run.check_return_code {
                line.push_str("; Check: CheckReturnCode");
            }
            out.push(line);
        }
        out.push(String::new());
    }

    // [Registry]
    if !spec.registry.is_empty() {
        out.push("[Registry]".to_string());
        for entry in &spec.registry {
            out.push(format!(
                r#"Root: {}; Subkey: "{}"; ValueType: {}; ValueName: "{}"; ValueData: "{}"; Flags: uninsdeletevalue"#,
                entry.root, entry.subkey, entry.value_type, entry.value_name, entry.value_data
            ));
        }
        out.push(String::new());
    }

    // [UninstallDelete]
    out.push("[UninstallDelete]".to_string());
    out.push(r#"Type: filesandordirs; Name: "{app}\Logs""#.to_string());
    out.push(r#"Type: files; Name: "{app}\settings.ini""#.to_string());
    out.push(String::new());

    if spec.custom_sections.is_empty() {
        out.push(DEFAULT_CODE_SECTION.to_string());
    } else {
        for section in &spec.custom_sections {
            out.push(format!("[{}]", section.section));
            out.push(section.body.clone());
            out.push(String::new());
        }
    }

    let mut script = out.join("\n");
    if !script.ends_with('\n') {
        script.push('\n');
    }
    script
}

/// Extracts the installer path from compiler output
///
/// Looks for a line such as `Output filename: C:\out\Setup.exe`.
pub fn parse_output_filename(compiler_output: &str) -> Option<String> {
    compiler_output.lines().find_map(|line| {
        let (_, rest) = line.split_once("Output filename:")?;
        let path = rest.trim();
        path.to_ascii_lowercase()
            .ends_with(".exe")
            .then(|| path.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shipyard_core::domain::installer::{
        CustomSection, InstallFile, InstallIcon, InstallRun, RegistryEntry,
    };

    fn spec() -> InstallerSpec {
        InstallerSpec {
            app_name: "My Enterprise App".to_string(),
            app_version: "2.1.0".to_string(),
            publisher: "Acme".to_string(),
            support_url: Some(String::new()),
            license_file: Some("LICENSE.txt".to_string()),
            main_executable: "Enterprise.exe".to_string(),
            files: vec![
                InstallFile {
                    source: "publish\\*".to_string(),
                    dest_dir: "{app}".to_string(),
                    flags: "ignoreversion recursesubdirs".to_string(),
                    excludes: vec![],
                },
                InstallFile {
                    source: "config".to_string(),
                    dest_dir: "{app}\\config".to_string(),
                    flags: "onlyifdoesntexist".to_string(),
                    excludes: vec!["*.bak".to_string(), "*.tmp".to_string()],
                },
            ],
            run: vec![InstallRun {
                filename: "{app}\\Enterprise.exe".to_string(),
                parameters: None,
                description: Some("Launch".to_string()),
                flags: "postinstall nowait".to_string(),
                check_return_code: true,
            }],
            icons: vec![InstallIcon {
                name: "{group}\\Tools".to_string(),
                filename: "{app}\\tools.exe".to_string(),
                parameters: Some("--safe".to_string()),
                working_dir: None,
                icon_filename: None,
                icon_index: 2,
            }],
            registry: vec![RegistryEntry {
                root: "HKCU".to_string(),
                subkey: "Software\\Acme\\Settings".to_string(),
                value_type: "string".to_string(),
                value_name: "InstallPath".to_string(),
                value_data: "{app}".to_string(),
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_sections_in_order() {
        let script = render(&spec());
        let order = [
            "[Setup]",
            "[Languages]",
            "[Tasks]",
            "[Files]",
            "[Icons]",
            "[Run]",
            "[Registry]",
            "[UninstallDelete]",
            "[Code]",
        ];
        let positions: Vec<usize> = order
            .iter()
            .map(|section| script.find(section).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_setup_directives() {
        let script = render(&spec());
        assert!(script.contains("AppName=My Enterprise App\n"));
        assert!(script.contains("LicenseFile=LICENSE.txt\n"));
        assert!(script.contains("SolidCompression=yes\n"));
        assert!(script.contains("ArchitecturesInstallIn64BitMode=x64\n"));
        // Empty optional values are omitted, not written blank
        assert!(!script.contains("AppSupportURL"));
        assert!(!script.contains("InfoBeforeFile"));
    }

    #[test]
    fn test_file_excludes_expand_to_entries() {
        let script = render(&spec());
        assert!(script.contains(r#"Source: "publish\*"; DestDir: "{app}"; Flags: ignoreversion recursesubdirs"#));
        assert!(script.contains(r#"Source: "config\*.bak"; DestDir: "{app}\config"; Flags: onlyifdoesntexist ignoreversion deleteafterinstall"#));
        assert!(script.contains(r#"Source: "config\*.tmp""#));
    }

    #[test]
    fn test_icons_run_and_registry() {
        let script = render(&spec());
        assert!(script.contains(r#"Name: "{group}\My Enterprise App"; Filename: "{app}\Enterprise.exe""#));
        assert!(script.contains(r#"Name: "{commondesktop}\My Enterprise App"; Filename: "{app}\Enterprise.exe"; Tasks: desktopicon"#));
        assert!(script.contains(r#"Name: "{group}\Tools"; Filename: "{app}\tools.exe"; Parameters: "--safe"; IconIndex: 2"#));
        assert!(script.contains(r#"Filename: "{app}\Enterprise.exe"; Description: "Launch"; Flags: postinstall nowait; Check: CheckReturnCode"#));
        assert!(script.contains(r#"Root: HKCU; Subkey: "Software\Acme\Settings"; ValueType: string; ValueName: "InstallPath"; ValueData: "{app}"; Flags: uninsdeletevalue"#));
    }

    #[test]
    fn test_empty_run_and_registry_sections_are_skipped() {
        let spec = InstallerSpec::default();
        let script = render(&spec);
        assert!(!script.contains("[Run]"));
        assert!(!script.contains("[Registry]"));
        assert!(script.contains("function InitializeSetup(): Boolean;"));
    }

    #[test]
    fn test_custom_sections_replace_default_code() {
        let mut spec = spec();
        spec.custom_sections = vec![CustomSection {
            section: "Code".to_string(),
            body: "procedure Noop; begin end;".to_string(),
        }];
        let script = render(&spec);
        assert!(script.contains("[Code]\nprocedure Noop; begin end;\n"));
        assert!(!script.contains("InitializeSetup"));
    }

    #[test]
    fn test_parse_output_filename() {
        let output = "Compiling...\nSuccessful compile (2.1 sec). Output filename: C:\\out\\Setup.exe\n";
        assert_eq!(
            parse_output_filename(output),
            Some("C:\\out\\Setup.exe".to_string())
        );
        assert_eq!(parse_output_filename("Successful compile"), None);
    }
}
