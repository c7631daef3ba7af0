//! In-process Typst compilation via typst-as-lib

use std::path::PathBuf;

use chrono::{Datelike, Timelike, Utc};
use tracing::{debug, warn};
use typst::foundations::{Datetime, Dict, Str, Value};
use typst::layout::PagedDocument;
use typst_as_lib::typst_kit_options::TypstKitFontOptions;
use typst_as_lib::TypstEngine;
use typst_pdf::{PdfOptions, PdfStandard, PdfStandards, Timestamp};

use super::{CompileError, CompileRequest, CompileResult, Compiler};

/// Compiler for converting Typst markup to PDF in-process
#[derive(Debug, Clone, Copy, Default)]
pub struct TypstCompiler;

impl TypstCompiler {
    pub fn new() -> Self {
        Self
    }
}

impl Compiler for TypstCompiler {
    fn name(&self) -> &'static str {
        "typst-embedded"
    }

    fn compile(&self, request: &CompileRequest) -> CompileResult<Vec<u8>> {
        let standards = pdf_standards(&request.pdf_standards)?;

        if request.ppi.is_some() {
            warn!(ppi = ?request.ppi, "PPI has no effect on PDF output");
        }

        let (document, warnings) = self.compile_document(request)?;
        for warning in &warnings {
            warn!("Typst: {}", warning);
        }

        // PDF/A export refuses documents without a creation date
        let options = PdfOptions {
            standards,
            timestamp: current_timestamp(),
            ..PdfOptions::default()
        };
        let pdf_bytes = typst_pdf::pdf(&document, &options).map_err(|errors| {
            CompileError::Export(
                errors
                    .iter()
                    .map(|e| e.message.to_string())
                    .collect::<Vec<_>>()
                    .join("; "),
            )
        })?;

        Ok(pdf_bytes.into())
    }
}

impl TypstCompiler {
    /// Lay out the document, returning it with the compiler warnings
    fn compile_document(
        &self,
        request: &CompileRequest,
    ) -> CompileResult<(PagedDocument, Vec<String>)> {
        let source = std::str::from_utf8(&request.input)?;

        let fonts = TypstKitFontOptions::default()
            .include_system_fonts(!request.ignore_system_fonts)
            .include_dirs(request.font_paths.iter().map(PathBuf::from));

        let mut builder = TypstEngine::builder()
            .main_file(source.to_string())
            .search_fonts_with(fonts);
        if let Some(root) = &request.root {
            builder = builder.with_file_system_resolver(root.as_str());
        }
        let engine = builder.build();

        let mut inputs = Dict::new();
        for (key, value) in &request.sys_inputs {
            inputs.insert(Str::from(key.as_str()), Value::Str(Str::from(value.as_str())));
        }

        debug!(
            root = ?request.root,
            fonts = request.font_paths.len(),
            ignore_system_fonts = request.ignore_system_fonts,
            standard = %request.pdf_standards,
            "Compiling Typst document"
        );

        let compiled = engine.compile_with_input::<_, PagedDocument>(inputs);
        let warnings = compiled
            .warnings
            .iter()
            .map(|warning| warning.message.to_string())
            .collect();

        let document = compiled
            .output
            .map_err(|e| CompileError::Compilation(format!("{:?}", e)))?;

        Ok((document, warnings))
    }
}

/// Current UTC time as a PDF creation timestamp
fn current_timestamp() -> Option<Timestamp> {
    let now = Utc::now();
    let datetime = Datetime::from_ymd_hms(
        now.year(),
        u8::try_from(now.month()).ok()?,
        u8::try_from(now.day()).ok()?,
        u8::try_from(now.hour()).ok()?,
        u8::try_from(now.minute()).ok()?,
        u8::try_from(now.second()).ok()?,
    )?;
    Some(Timestamp::new_utc(datetime))
}

fn pdf_standards(identifier: &str) -> CompileResult<PdfStandards> {
    let standard = match identifier {
        "1.7" => PdfStandard::V_1_7,
        "a-2b" => PdfStandard::A_2b,
        "a-3b" => PdfStandard::A_3b,
        other => return Err(CompileError::UnsupportedStandard(other.to_string())),
    };
    PdfStandards::new(&[standard]).map_err(|e| CompileError::UnsupportedStandard(e.to_string()))
}
