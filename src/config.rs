//! Configuration management for the membership server

use serde::Deserialize;
use std::env;
use std::path::PathBuf;

use crate::extract::DEFAULT_OCR_DPI;
use crate::ocr::OcrProvider;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub paths: PathsConfig,
    pub verification: VerificationConfig,
    pub ocr: OcrConfig,
    pub card: CardConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

/// Filesystem locations for uploads, rendered cards and static assets
#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    pub base_upload_dir: PathBuf,
    pub temp_upload_dir: PathBuf,
    pub pdf_upload_dir: PathBuf,
    pub photo_upload_dir: PathBuf,
    pub cards_dir: PathBuf,
    pub static_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerificationConfig {
    /// Lifetime of a verification token
    pub ttl_minutes: i64,
    /// Upper bound for one extraction (text pass + OCR pass)
    pub extraction_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OcrConfig {
    pub providers: Vec<OcrProvider>,
    pub dpi: u32,
    pub language: String,
    pub ollama_url: String,
    pub ollama_model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CardConfig {
    pub font_regular: PathBuf,
    pub font_bold: PathBuf,
}

impl PathsConfig {
    /// Derive every directory from a single base directory
    pub fn under(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        Self {
            temp_upload_dir: base.join("tmp"),
            pdf_upload_dir: base.join("voterid_proof"),
            photo_upload_dir: base.join("photos"),
            cards_dir: base.join("cards"),
            static_dir: PathBuf::from("./static"),
            base_upload_dir: base,
        }
    }

    /// Card template location
    pub fn template_path(&self) -> PathBuf {
        self.static_dir.join("card_template.png")
    }

    /// Signature overlay location
    pub fn overlay_path(&self) -> PathBuf {
        self.static_dir.join("signature_overlay.png")
    }

    /// All directories that must exist before serving requests
    pub fn all_dirs(&self) -> [&PathBuf; 5] {
        [
            &self.temp_upload_dir,
            &self.pdf_upload_dir,
            &self.photo_upload_dir,
            &self.cards_dir,
            &self.static_dir,
        ]
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            providers: vec![OcrProvider::Tesseract],
            dpi: DEFAULT_OCR_DPI,
            language: "eng".to_string(),
            ollama_url: "http://localhost:11434".to_string(),
            ollama_model: "llava".to_string(),
        }
    }
}

impl Default for CardConfig {
    fn default() -> Self {
        Self {
            font_regular: PathBuf::from(
                "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
            ),
            font_bold: PathBuf::from(
                "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
            ),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
            database: DatabaseConfig {
                url: "sqlite:./members_local.sqlite".to_string(),
            },
            paths: PathsConfig::under("./volunteers_files"),
            verification: VerificationConfig {
                ttl_minutes: 15,
                extraction_timeout_secs: 120,
            },
            ocr: OcrConfig::default(),
            card: CardConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        let defaults = Config::default();

        let base = env::var("BASE_UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| defaults.paths.base_upload_dir.clone());
        let derived = PathsConfig::under(&base);
        let path_var = |key: &str, fallback: PathBuf| {
            env::var(key).map(PathBuf::from).unwrap_or(fallback)
        };

        let providers = match env::var("OCR_PROVIDERS") {
            Ok(list) => parse_providers(&list),
            Err(_) => defaults.ocr.providers.clone(),
        };

        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parse_or("SERVER_PORT", defaults.server.port),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or(defaults.database.url),
            },
            paths: PathsConfig {
                temp_upload_dir: path_var("TEMP_UPLOAD_DIR", derived.temp_upload_dir),
                pdf_upload_dir: path_var("PDF_UPLOAD_DIR", derived.pdf_upload_dir),
                photo_upload_dir: path_var("PHOTO_UPLOAD_DIR", derived.photo_upload_dir),
                cards_dir: path_var("CARDS_DIR", derived.cards_dir),
                static_dir: path_var("STATIC_DIR", derived.static_dir),
                base_upload_dir: base,
            },
            verification: VerificationConfig {
                ttl_minutes: parse_or(
                    "VERIFICATION_TTL_MINUTES",
                    defaults.verification.ttl_minutes,
                ),
                extraction_timeout_secs: parse_or(
                    "EXTRACTION_TIMEOUT_SECS",
                    defaults.verification.extraction_timeout_secs,
                ),
            },
            ocr: OcrConfig {
                providers,
                dpi: parse_or("OCR_DPI", defaults.ocr.dpi),
                language: env::var("OCR_LANGUAGE").unwrap_or(defaults.ocr.language),
                ollama_url: env::var("OLLAMA_URL").unwrap_or(defaults.ocr.ollama_url),
                ollama_model: env::var("OLLAMA_MODEL").unwrap_or(defaults.ocr.ollama_model),
            },
            card: CardConfig {
                font_regular: path_var("FONT_REGULAR_PATH", defaults.card.font_regular),
                font_bold: path_var("FONT_BOLD_PATH", defaults.card.font_bold),
            },
        })
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, fallback: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(fallback)
}

/// Parse a comma-separated provider list, ignoring unknown names
fn parse_providers(list: &str) -> Vec<OcrProvider> {
    list.split(',')
        .filter_map(|name| match name.trim().to_lowercase().as_str() {
            "tesseract" => Some(OcrProvider::Tesseract),
            "ollama" => Some(OcrProvider::Ollama),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_under_base() {
        let paths = PathsConfig::under("/srv/members");
        assert_eq!(paths.temp_upload_dir, PathBuf::from("/srv/members/tmp"));
        assert_eq!(paths.pdf_upload_dir, PathBuf::from("/srv/members/voterid_proof"));
        assert_eq!(paths.photo_upload_dir, PathBuf::from("/srv/members/photos"));
        assert_eq!(paths.cards_dir, PathBuf::from("/srv/members/cards"));
        assert!(paths.template_path().ends_with("card_template.png"));
        assert!(paths.overlay_path().ends_with("signature_overlay.png"));
    }

    #[test]
    fn test_parse_providers() {
        assert_eq!(
            parse_providers("ollama, Tesseract,unknown"),
            vec![OcrProvider::Ollama, OcrProvider::Tesseract]
        );
        assert!(parse_providers("").is_empty());
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.verification.ttl_minutes, 15);
        assert_eq!(config.ocr.dpi, 300);
        assert_eq!(config.ocr.language, "eng");
    }
}
