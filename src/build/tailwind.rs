//! Utility CSS compilation.
//!
//! The compiled stylesheet is shared by every page and held in an
//! [`ArcSwap`] so a refresh from the watcher never blocks readers.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;
use tokio::process::Command;
use uuid::Uuid;

use crate::config::schema::{FrontendConfig, TailwindConfig};

const INPUT_CSS: &str = "@tailwind base;\n@tailwind components;\n@tailwind utilities;\n";

#[derive(Debug, thiserror::Error)]
pub enum TailwindError {
    #[error("failed to prepare tailwind workspace: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to launch `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("tailwind exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
}

/// Runs the tailwind CLI against the project config.
#[derive(Debug, Clone)]
pub struct TailwindCompiler {
    command: String,
    config_path: PathBuf,
}

impl TailwindCompiler {
    pub fn new(tailwind: &TailwindConfig, frontend: &FrontendConfig) -> Self {
        Self {
            command: tailwind.command.clone(),
            config_path: Path::new(&frontend.root_path).join(&tailwind.config_file),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Compile the base/components/utilities layers into minified CSS.
    pub async fn compile(&self) -> Result<String, TailwindError> {
        let workdir = std::env::temp_dir().join(format!("luna-tailwind-{}", Uuid::new_v4()));
        tokio::fs::create_dir_all(&workdir).await?;

        let result = self.run(&workdir).await;
        let _ = tokio::fs::remove_dir_all(&workdir).await;
        result
    }

    async fn run(&self, workdir: &Path) -> Result<String, TailwindError> {
        let input = workdir.join("input.css");
        let output = workdir.join("output.css");
        tokio::fs::write(&input, INPUT_CSS).await?;

        let out = Command::new(&self.command)
            .arg("tailwindcss")
            .arg("-i")
            .arg(&input)
            .arg("-o")
            .arg(&output)
            .arg("--config")
            .arg(&self.config_path)
            .arg("--minify")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| TailwindError::Spawn {
                program: self.command.clone(),
                source,
            })?;

        if !out.status.success() {
            return Err(TailwindError::Failed {
                status: out.status.to_string(),
                stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            });
        }

        Ok(tokio::fs::read_to_string(&output).await?)
    }
}

/// Current utility stylesheet.
pub struct Stylesheet {
    compiler: Option<TailwindCompiler>,
    css: ArcSwap<String>,
}

impl Stylesheet {
    pub fn new(compiler: Option<TailwindCompiler>) -> Self {
        Self {
            compiler,
            css: ArcSwap::from_pointee(String::new()),
        }
    }

    /// A stylesheet that never changes. Used when tailwind is disabled.
    pub fn fixed(css: impl Into<String>) -> Self {
        Self {
            compiler: None,
            css: ArcSwap::from_pointee(css.into()),
        }
    }

    pub fn current(&self) -> Arc<String> {
        self.css.load_full()
    }

    /// Recompile and swap in the new CSS. On failure the previous
    /// stylesheet stays in place.
    pub async fn refresh(&self) -> Result<(), TailwindError> {
        let Some(compiler) = &self.compiler else {
            return Ok(());
        };

        let start = Instant::now();
        let css = compiler.compile().await?;
        tracing::info!(
            bytes = css.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Utility CSS compiled"
        );
        self.css.store(Arc::new(css));
        Ok(())
    }
}
