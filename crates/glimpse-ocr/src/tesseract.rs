use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::engine::{OcrEngine, OcrError};
use crate::snapshot::Snapshot;

/// Traditional OCR through the `tesseract` executable
pub struct TesseractEngine {
    program: String,
    language: String,
    psm: Option<u8>,
    ready: bool,
}

impl TesseractEngine {
    /// `language` may combine models, e.g. "eng+deu"
    pub fn new(program: &str, language: &str, psm: Option<u8>) -> Self {
        Self {
            program: program.to_string(),
            language: language.to_string(),
            psm,
            ready: false,
        }
    }

    async fn installed_languages(&self) -> Result<Vec<String>, OcrError> {
        let output = Command::new(&self.program)
            .arg("--list-langs")
            .output()
            .await
            .map_err(|source| OcrError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        // Older releases print the list to stderr
        let mut listing = String::from_utf8_lossy(&output.stdout).into_owned();
        listing.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(parse_language_list(&listing))
    }
}

#[async_trait::async_trait]
impl OcrEngine for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    async fn initialize(&mut self) -> Result<(), OcrError> {
        let installed = self.installed_languages().await?;
        tracing::debug!("tesseract languages: {:?}", installed);

        if let Some(missing) = self
            .language
            .split('+')
            .find(|lang| !installed.iter().any(|l| l == lang))
        {
            return Err(OcrError::MissingLanguage(missing.to_string()));
        }

        self.ready = true;
        tracing::info!("tesseract ready ({})", self.language);
        Ok(())
    }

    async fn recognize(&self, snapshot: &Snapshot) -> Result<String, OcrError> {
        if !self.ready {
            return Err(OcrError::NotInitialized);
        }

        let mut command = Command::new(&self.program);
        command.args(["stdin", "stdout", "-l", self.language.as_str()]);
        if let Some(psm) = self.psm {
            command.arg("--psm").arg(psm.to_string());
        }

        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| OcrError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(snapshot.bytes())
                .await
                .map_err(|e| OcrError::Backend(format!("failed to feed image: {e}")))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| OcrError::Backend(e.to_string()))?;

        if !output.status.success() {
            return Err(OcrError::Backend(format!(
                "tesseract exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn parse_language_list(listing: &str) -> Vec<String> {
    listing
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("List of available languages"))
        .filter(|line| !line.contains(' '))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_listing_skips_header() {
        let listing = concat!(
            "List of available languages in \"/usr/share/tesseract-ocr/5/tessdata/\" (3):\n",
            "eng\nosd\njpn\n",
        );
        assert_eq!(parse_language_list(listing), vec!["eng", "osd", "jpn"]);
    }

    #[test]
    fn language_listing_ignores_noise() {
        let listing = "Error opening data file foo\n\neng\n";
        assert_eq!(parse_language_list(listing), vec!["eng"]);
    }

    #[tokio::test]
    async fn recognize_before_initialize_is_refused() {
        let engine = TesseractEngine::new("tesseract", "eng", None);
        let snapshot = Snapshot::from_rgba(1, 1, vec![0, 0, 0, 255]).unwrap();
        assert!(matches!(
            engine.recognize(&snapshot).await,
            Err(OcrError::NotInitialized)
        ));
    }

    #[tokio::test]
    async fn missing_binary_fails_initialization() {
        let mut engine = TesseractEngine::new("/nonexistent/tesseract", "eng", None);
        assert!(matches!(
            engine.initialize().await,
            Err(OcrError::Spawn { .. })
        ));
    }
}
