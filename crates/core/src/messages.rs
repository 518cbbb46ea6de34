//! Short, generic user-facing messages for timeline failures.
//!
//! Write paths never show raw error detail to end users; they show one of
//! these messages in the caller's locale instead.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locale {
    #[default]
    En,
    Es,
}

impl FromStr for Locale {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lang = s.trim().to_ascii_lowercase();
        match lang.split(['-', '_']).next().unwrap_or_default() {
            "en" => Ok(Self::En),
            "es" => Ok(Self::Es),
            _ => Err(CoreError::UnknownLocale(lang)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserMessage {
    LoadFailed,
    SubmitFailed,
    CorrectionFailed,
    UploadFailed,
    DownloadFailed,
    EmptyBody,
    NotAuthorized,
    FinanceVisibilityNotAllowed,
    NotCorrectable,
}

impl UserMessage {
    pub fn text(self, locale: Locale) -> &'static str {
        match (self, locale) {
            (Self::LoadFailed, Locale::En) => "The timeline could not be loaded. Try again.",
            (Self::LoadFailed, Locale::Es) => {
                "No se pudo cargar la línea de tiempo. Inténtelo de nuevo."
            }
            (Self::SubmitFailed, Locale::En) => "The comment could not be saved. Try again.",
            (Self::SubmitFailed, Locale::Es) => {
                "No se pudo guardar el comentario. Inténtelo de nuevo."
            }
            (Self::CorrectionFailed, Locale::En) => {
                "The correction could not be saved. Try again."
            }
            (Self::CorrectionFailed, Locale::Es) => {
                "No se pudo guardar la corrección. Inténtelo de nuevo."
            }
            (Self::UploadFailed, Locale::En) => "The file could not be attached. Try again.",
            (Self::UploadFailed, Locale::Es) => {
                "No se pudo adjuntar el archivo. Inténtelo de nuevo."
            }
            (Self::DownloadFailed, Locale::En) => "The file could not be downloaded.",
            (Self::DownloadFailed, Locale::Es) => "No se pudo descargar el archivo.",
            (Self::EmptyBody, Locale::En) => "Write a comment before sending.",
            (Self::EmptyBody, Locale::Es) => "Escriba un comentario antes de enviar.",
            (Self::NotAuthorized, Locale::En) => "You do not have permission for this action.",
            (Self::NotAuthorized, Locale::Es) => "No tiene permiso para realizar esta acción.",
            (Self::FinanceVisibilityNotAllowed, Locale::En) => {
                "Finance-only visibility is not available for your role."
            }
            (Self::FinanceVisibilityNotAllowed, Locale::Es) => {
                "La visibilidad solo para finanzas no está disponible para su rol."
            }
            (Self::NotCorrectable, Locale::En) => "Only comments can be corrected.",
            (Self::NotCorrectable, Locale::Es) => "Solo se pueden corregir comentarios.",
        }
    }
}

impl fmt::Display for UserMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text(Locale::default()))
    }
}
