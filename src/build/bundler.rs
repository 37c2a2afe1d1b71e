//! External bundler invocation.
//!
//! # Responsibilities
//! - Describe one bundling job ([`BundleRequest`])
//! - Run it through a swappable [`Bundler`] implementation
//! - Hand back every emitted file; classification happens in the pipeline
//!
//! # Design Decisions
//! - esbuild runs as a subprocess with its own temporary work directory
//! - Large defines (props, store) are injected from a module in that
//!   directory, keeping every argument small
//! - The directory is removed after every run, success or failure
//! - Static assets go through esbuild's `file` loader

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use futures_util::future::BoxFuture;
use tokio::process::Command;
use uuid::Uuid;
use walkdir::WalkDir;

use crate::build::BuildError;
use crate::config::schema::BundlerConfig;

/// Extensions copied verbatim to the output directory.
const FILE_LOADER_EXTENSIONS: &[&str] = &[
    ".png", ".svg", ".jpg", ".jpeg", ".gif", ".bmp", ".woff2", ".woff", ".ttf", ".eot", ".mp4",
    ".webm", ".wav", ".mp3", ".m4a", ".aac", ".oga", ".json", ".txt", ".xml", ".csv", ".html",
];

/// Which execution environment a bundle targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildTarget {
    Client,
    Server,
}

impl BuildTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildTarget::Client => "client",
            BuildTarget::Server => "server",
        }
    }
}

impl fmt::Display for BuildTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One bundling job.
#[derive(Debug, Clone)]
pub struct BundleRequest {
    pub target: BuildTarget,
    pub entry_point: PathBuf,
    /// Identifier -> JS expression substituted at compile time.
    pub defines: BTreeMap<String, String>,
    pub minify: bool,
    /// Prepended to the JS output.
    pub banner: Option<String>,
    /// Emit an ES module for the given language target.
    pub esm_target: Option<String>,
}

/// A file emitted by the bundler.
#[derive(Debug, Clone)]
pub struct OutputFile {
    pub path: PathBuf,
    pub contents: Vec<u8>,
}

/// Something that can turn an entry point into output files.
pub trait Bundler: Send + Sync {
    fn bundle(&self, request: BundleRequest) -> BoxFuture<'_, Result<Vec<OutputFile>, BuildError>>;
}

/// Defines longer than this are exported from an injected module rather
/// than passed as `--define`; the OS caps the size of a single argument.
pub const INLINE_DEFINE_LIMIT: usize = 8 * 1024;

/// File name of the injected define module inside the work directory.
const DEFINES_MODULE: &str = "defines.js";

/// Runs the esbuild CLI.
#[derive(Debug, Clone)]
pub struct EsbuildCli {
    binary: String,
    asset_names: String,
}

impl EsbuildCli {
    pub fn new(config: &BundlerConfig) -> Self {
        Self {
            binary: config.esbuild_bin.clone(),
            asset_names: config.asset_names.clone(),
        }
    }

    /// Command-line arguments for `request`. Output lands in
    /// `workdir/out`; oversized defines are injected from
    /// `workdir/defines.js` (see [`EsbuildCli::defines_module`]).
    pub fn args(&self, request: &BundleRequest, workdir: &Path) -> Vec<String> {
        let mut args = vec![
            request.entry_point.display().to_string(),
            "--bundle".to_string(),
            format!("--outdir={}", workdir.join("out").display()),
            format!("--asset-names={}", self.asset_names),
            "--log-level=error".to_string(),
        ];

        for ext in FILE_LOADER_EXTENSIONS {
            args.push(format!("--loader:{ext}=file"));
        }

        for (name, value) in &request.defines {
            if !is_injected(name, value) {
                args.push(format!("--define:{name}={value}"));
            }
        }
        if request.defines.iter().any(|(name, value)| is_injected(name, value)) {
            args.push(format!("--inject:{}", workdir.join(DEFINES_MODULE).display()));
        }

        if request.minify {
            args.push("--minify-whitespace".to_string());
            args.push("--minify-identifiers".to_string());
            args.push("--minify-syntax".to_string());
        }

        if let Some(target) = &request.esm_target {
            args.push("--format=esm".to_string());
            args.push("--platform=browser".to_string());
            args.push(format!("--target={target}"));
        }

        if let Some(banner) = &request.banner {
            args.push(format!("--banner:js={banner}"));
        }

        args
    }

    /// Module exporting every define too large for the command line.
    /// esbuild rewrites free references to each name into an import of it.
    pub fn defines_module(request: &BundleRequest) -> Option<String> {
        let module: String = request
            .defines
            .iter()
            .filter(|(name, value)| is_injected(name, value))
            .map(|(name, value)| format!("export const {name} = {value};\n"))
            .collect();
        (!module.is_empty()).then_some(module)
    }

    async fn run(&self, request: &BundleRequest, workdir: &Path) -> Result<Vec<OutputFile>, BuildError> {
        let output_error = |source| BuildError::Output { target: request.target, source };
        let outdir = workdir.join("out");
        tokio::fs::create_dir_all(&outdir).await.map_err(output_error)?;

        if let Some(module) = Self::defines_module(request) {
            tokio::fs::write(workdir.join(DEFINES_MODULE), module)
                .await
                .map_err(output_error)?;
        }

        let output = Command::new(&self.binary)
            .args(self.args(request, workdir))
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| BuildError::Spawn {
                program: self.binary.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(BuildError::Bundler {
                target: request.target,
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        tokio::task::spawn_blocking(move || collect_outputs(&outdir))
            .await
            .map_err(|e| output_error(io::Error::other(e)))?
            .map_err(output_error)
    }
}

/// Plain identifiers with long values go through the injected module.
/// Dotted names (`process.env.X`) can only be expressed as `--define`.
fn is_injected(name: &str, value: &str) -> bool {
    value.len() > INLINE_DEFINE_LIMIT && is_identifier(name)
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Every file under `outdir`, paths relative to it, in name order.
fn collect_outputs(outdir: &Path) -> io::Result<Vec<OutputFile>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(outdir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let contents = std::fs::read(entry.path())?;
        let path = entry
            .path()
            .strip_prefix(outdir)
            .unwrap_or(entry.path())
            .to_path_buf();
        files.push(OutputFile { path, contents });
    }
    Ok(files)
}

impl Bundler for EsbuildCli {
    fn bundle(&self, request: BundleRequest) -> BoxFuture<'_, Result<Vec<OutputFile>, BuildError>> {
        Box::pin(async move {
            let workdir = std::env::temp_dir().join(format!("luna-{}-{}", request.target, Uuid::new_v4()));
            let result = self.run(&request, &workdir).await;

            if let Err(e) = tokio::fs::remove_dir_all(&workdir).await {
                if e.kind() != io::ErrorKind::NotFound {
                    tracing::warn!(dir = %workdir.display(), error = %e, "Failed to remove build directory");
                }
            }
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(target: BuildTarget) -> BundleRequest {
        let mut defines = BTreeMap::new();
        defines.insert("props".to_string(), r#"{"id":1}"#.to_string());
        BundleRequest {
            target,
            entry_point: PathBuf::from("frontend/src/entry-client.tsx"),
            defines,
            minify: false,
            banner: None,
            esm_target: None,
        }
    }

    fn large_props() -> String {
        format!(r#"{{"blob":"{}"}}"#, "x".repeat(200_000))
    }

    fn cli() -> EsbuildCli {
        EsbuildCli::new(&BundlerConfig::default())
    }

    #[test]
    fn test_client_args() {
        let args = cli().args(&request(BuildTarget::Client), Path::new("/tmp/work"));
        assert_eq!(args[0], "frontend/src/entry-client.tsx");
        assert!(args.contains(&"--bundle".to_string()));
        assert!(args.contains(&"--outdir=/tmp/work/out".to_string()));
        assert!(args.contains(&r#"--define:props={"id":1}"#.to_string()));
        assert!(args.contains(&"--loader:.png=file".to_string()));
        assert!(!args.iter().any(|a| a.starts_with("--inject")));
        assert!(!args.iter().any(|a| a.starts_with("--minify")));
        assert!(!args.iter().any(|a| a.starts_with("--format")));
        assert!(!args.iter().any(|a| a.starts_with("--banner")));
        assert!(EsbuildCli::defines_module(&request(BuildTarget::Client)).is_none());
    }

    #[test]
    fn test_server_args() {
        let mut req = request(BuildTarget::Server);
        req.minify = true;
        req.banner = Some("var x=1;".to_string());
        req.esm_target = Some("es2020".to_string());

        let args = cli().args(&req, Path::new("/tmp/work"));
        for flag in [
            "--minify-whitespace",
            "--minify-identifiers",
            "--minify-syntax",
            "--format=esm",
            "--platform=browser",
            "--target=es2020",
            "--banner:js=var x=1;",
        ] {
            assert!(args.contains(&flag.to_string()), "missing {flag}");
        }
    }

    #[test]
    fn test_large_defines_are_injected() {
        let mut req = request(BuildTarget::Server);
        req.defines.insert("props".to_string(), large_props());
        req.defines.insert("global".to_string(), "globalThis".to_string());

        let args = cli().args(&req, Path::new("/tmp/work"));
        assert!(args.iter().all(|a| a.len() < INLINE_DEFINE_LIMIT));
        assert!(args.contains(&"--inject:/tmp/work/defines.js".to_string()));
        assert!(args.contains(&"--define:global=globalThis".to_string()));
        assert!(!args.iter().any(|a| a.starts_with("--define:props")));

        let module = EsbuildCli::defines_module(&req).unwrap();
        assert!(module.starts_with(r#"export const props = {"blob":"xxx"#));
        assert!(!module.contains("global"));
    }

    #[test]
    fn test_dotted_define_never_injected() {
        assert!(!is_injected("process.env.DATA", &large_props()));
        assert!(is_injected("__LUNA_ROUTE_PATH__", &large_props()));
        assert!(!is_injected("props", "{}"));
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let cli = EsbuildCli::new(&BundlerConfig {
            esbuild_bin: "luna-esbuild-does-not-exist".to_string(),
            ..BundlerConfig::default()
        });
        let err = cli.bundle(request(BuildTarget::Client)).await.unwrap_err();
        assert!(matches!(err, BuildError::Spawn { .. }));
    }

    /// `sh` stands in for esbuild: the entry point is the script, which copies
    /// the injected module into the output directory.
    #[cfg(unix)]
    #[tokio::test]
    async fn test_large_props_reach_the_bundler() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-esbuild.sh");
        std::fs::write(
            &script,
            r#"for arg in "$@"; do
  case "$arg" in
    --outdir=*) out="${arg#--outdir=}" ;;
    --inject:*) inject="${arg#--inject:}" ;;
  esac
done
cat "$inject" > "$out/entry.js"
printf 'a{}' > "$out/entry.css"
"#,
        )
        .unwrap();

        let cli = EsbuildCli::new(&BundlerConfig {
            esbuild_bin: "sh".to_string(),
            ..BundlerConfig::default()
        });
        let mut req = request(BuildTarget::Client);
        req.entry_point = script;
        req.defines.insert("props".to_string(), large_props());

        let files = cli.bundle(req).await.unwrap();
        let names: Vec<_> = files.iter().map(|f| f.path.display().to_string()).collect();
        assert_eq!(names, ["entry.css", "entry.js"]);
        let js = String::from_utf8(files[1].contents.clone()).unwrap();
        assert!(js.starts_with("export const props = "));
        assert!(js.len() > 200_000);
    }
}
