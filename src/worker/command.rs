use std::ffi::OsString;

use crate::config::{StderrMode, ToolConfig};
use crate::worker::request::RunRequest;

/// How the external tool is reached: its program name, the search path used to
/// resolve it, and any arguments that precede the per-run ones.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCommand {
    pub program: String,
    pub leading_args: Vec<String>,
    pub search_path: OsString,
    pub stderr: StderrMode,
}

impl ToolCommand {
    pub fn from_config(tool: &ToolConfig, search_path: OsString) -> Self {
        Self {
            program: tool.program.clone(),
            leading_args: tool.extra_args.clone(),
            search_path,
            stderr: tool.stderr,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<OsString>,
}

impl Invocation {
    pub fn display_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }
}

pub fn build_invocation(tool: &ToolCommand, request: &RunRequest) -> Invocation {
    let mut args: Vec<OsString> = tool.leading_args.iter().map(OsString::from).collect();

    args.push(request.input_path.clone().into_os_string());
    args.push("--output".into());
    args.push(request.output_path.clone().into_os_string());
    args.push("--replacewith".into());
    args.push(request.method.as_str().into());
    args.push("--thresh".into());
    args.push(request.detection_threshold.to_string().into());
    args.push("--mosaicsize".into());
    args.push(request.mosaic_block_size.to_string().into());
    if request.keep_audio {
        args.push("--keep-audio".into());
    }
    if request.preview {
        args.push("--preview".into());
    }

    Invocation {
        program: tool.program.clone(),
        args,
    }
}

#[cfg(test)]
mod tests {
    use super::{build_invocation, Invocation, ToolCommand};
    use crate::config::{StderrMode, ToolConfig};
    use crate::worker::request::{Method, RunRequest};
    use std::ffi::OsString;
    use std::path::PathBuf;

    fn request(method: Method, keep_audio: bool, preview: bool) -> RunRequest {
        RunRequest {
            input_path: PathBuf::from("/tmp/a.mp4"),
            output_path: PathBuf::from("/tmp/a_out.mp4"),
            method,
            keep_audio,
            preview,
            detection_threshold: 0.2,
            mosaic_block_size: 20,
        }
    }

    fn args(invocation: &Invocation) -> Vec<String> {
        invocation
            .args
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn maps_every_request_field_to_a_flag() {
        let tool = ToolCommand::from_config(&ToolConfig::default(), OsString::from("/usr/bin"));
        let invocation = build_invocation(&tool, &request(Method::Blur, true, true));

        assert_eq!(invocation.program, "deface");
        assert_eq!(
            args(&invocation),
            [
                "/tmp/a.mp4",
                "--output",
                "/tmp/a_out.mp4",
                "--replacewith",
                "blur",
                "--thresh",
                "0.2",
                "--mosaicsize",
                "20",
                "--keep-audio",
                "--preview",
            ]
        );
    }

    #[test]
    fn mosaic_size_is_passed_for_every_method_and_switches_are_optional() {
        let tool = ToolCommand::from_config(&ToolConfig::default(), OsString::new());
        let invocation = build_invocation(&tool, &request(Method::Solid, false, false));
        let args = args(&invocation);

        assert!(args.windows(2).any(|pair| pair == ["--replacewith", "solid"]));
        assert!(args.windows(2).any(|pair| pair == ["--mosaicsize", "20"]));
        assert!(!args.iter().any(|arg| arg == "--keep-audio"));
        assert!(!args.iter().any(|arg| arg == "--preview"));
    }

    #[test]
    fn leading_args_come_before_the_input() {
        let config = ToolConfig {
            program: "python3".to_owned(),
            extra_args: vec!["-m".to_owned(), "deface".to_owned()],
            stderr: StderrMode::Discard,
            ..ToolConfig::default()
        };
        let tool = ToolCommand::from_config(&config, OsString::new());
        let invocation = build_invocation(&tool, &request(Method::Mosaic, true, false));

        assert_eq!(invocation.program, "python3");
        assert_eq!(&args(&invocation)[..3], ["-m", "deface", "/tmp/a.mp4"]);
        assert_eq!(tool.stderr, StderrMode::Discard);
        assert!(invocation
            .display_line()
            .starts_with("python3 -m deface /tmp/a.mp4 --output"));
    }
}
