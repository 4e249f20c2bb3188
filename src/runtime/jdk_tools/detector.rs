use super::JdkToolsError;
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Debug, Clone)]
pub enum ToolStatus {
    Available { path: PathBuf },
    NotFound,
    NotExecutable { path: PathBuf },
}

impl ToolStatus {
    pub fn is_available(&self) -> bool {
        matches!(self, ToolStatus::Available { .. })
    }
}

#[derive(Debug, Clone)]
pub struct JdkTools {
    pub jstat: ToolStatus,
    pub java_home: Option<PathBuf>,
}

impl JdkTools {
    pub fn detect() -> Self {
        let java_home = std::env::var("JAVA_HOME").ok().map(PathBuf::from);

        Self {
            jstat: detect_tool("jstat", java_home.as_deref()),
            java_home,
        }
    }

    pub fn jstat_path(&self) -> Result<PathBuf, JdkToolsError> {
        match &self.jstat {
            ToolStatus::Available { path } => Ok(path.clone()),
            _ => Err(JdkToolsError::JstatNotFound),
        }
    }

    pub fn installation_guidance(&self) -> String {
        let mut guidance = String::from("jstat is required to sample a JVM.\n");
        guidance.push_str("Install a JDK (11 or newer), e.g. from https://adoptium.net/\n");

        match &self.java_home {
            Some(java_home) => guidance.push_str(&format!(
                "JAVA_HOME is set to {}; make sure {} exists.\n",
                java_home.display(),
                java_home.join("bin").join("jstat").display()
            )),
            None => guidance.push_str("JAVA_HOME is not set and jstat is not on PATH.\n"),
        }

        guidance
    }
}

fn candidate_paths(name: &str, java_home: Option<&Path>) -> Vec<PathBuf> {
    java_home
        .map(|home| {
            let mut path = home.join("bin").join(name);
            if cfg!(target_os = "windows") {
                path.set_extension("exe");
            }
            path
        })
        .into_iter()
        .chain(std::iter::once(PathBuf::from(name)))
        .collect()
}

fn detect_tool(name: &str, java_home: Option<&Path>) -> ToolStatus {
    for path in candidate_paths(name, java_home) {
        match Command::new(&path).arg("-help").output() {
            Ok(_) => return ToolStatus::Available { path },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(_) => return ToolStatus::NotExecutable { path },
        }
    }

    ToolStatus::NotFound
}
