use crate::classifier::ActionClassifier;
use crate::config::Config;
use crate::emitter::Emitter;
use crate::error::{Error, Result};
use crate::joiner::{JoinInputs, RecordJoiner};
use crate::normalizer::TextNormalizer;
use crate::sources::{self, RawText, SourceBatch};
use crate::types::{BillRecord, BillText, Era};
use futures::StreamExt;
use std::path::PathBuf;
use tracing::{info, warn};

/// Summary of one pipeline run
#[derive(Debug, Default)]
pub struct RunReport {
    pub rows: usize,
    /// Records rejected for malformed identifiers or session labels
    pub rejected: Vec<Error>,
    /// Non-bill records skipped at ingest
    pub skipped: usize,
    pub missing_text: usize,
    pub artifact: Option<PathBuf>,
}

/// Drives one era from raw exports to its output artifact
pub struct PipelineProcessor {
    config: Config,
    classifier: ActionClassifier,
    normalizer: TextNormalizer,
    joiner: RecordJoiner,
}

impl PipelineProcessor {
    /// Create a new processor, compiling the configured patterns
    pub fn new(config: Config) -> Result<Self> {
        let classifier = ActionClassifier::new(&config.patterns.actions)?;
        let normalizer = TextNormalizer::new(&config.patterns.text)?;
        Ok(Self {
            config,
            classifier,
            normalizer,
            joiner: RecordJoiner::new(),
        })
    }

    /// Read bills and actions from the era's export
    pub async fn load_sources(&self) -> Result<SourceBatch> {
        match self.config.era {
            Era::Current => sources::read_current(&self.config.input).await,
            Era::Legacy => sources::read_legacy(&self.config.input).await,
        }
    }

    /// Read raw text files; key errors are collected into `rejected`
    pub async fn load_texts(&self, rejected: &mut Vec<Error>) -> Result<Vec<RawText>> {
        let text_dir = match &self.config.text_dir {
            Some(dir) => dir.clone(),
            None => {
                warn!("no text directory configured; text will be null");
                return Ok(Vec::new());
            }
        };

        let mut texts = Vec::new();
        let mut stream = sources::read_texts(text_dir);
        while let Some(result) = stream.next().await {
            match result {
                Ok(text) => texts.push(text),
                Err(e) if e.is_record_level() => {
                    warn!(error = %e, "rejected text file");
                    rejected.push(e);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(texts)
    }

    /// Normalize raw texts for the sessions this run keeps
    pub fn normalize_texts(&self, raw: Vec<RawText>) -> Vec<BillText> {
        raw.into_iter()
            .filter(|text| self.config.keeps_session(text.session))
            .map(|text| BillText {
                session: text.session,
                bill_id: text.bill_id,
                normalized: self.normalizer.normalize(&text.raw),
                raw: text.raw,
            })
            .collect()
    }

    /// Classify, clean and join; the synchronous core of a run
    pub fn build(&self, batch: SourceBatch, texts: Vec<BillText>) -> Result<Vec<BillRecord>> {
        let SourceBatch {
            mut bills,
            mut actions,
            sponsors,
            ..
        } = batch;

        bills.retain(|bill| self.config.keeps_session(bill.session));
        actions.retain(|action| self.config.keeps_session(action.session));
        let sponsors = sponsors.map(|mut rows| {
            rows.retain(|row| self.config.keeps_session(row.key.session));
            rows
        });

        for bill in &mut bills {
            bill.title = self.normalizer.clean_title(&bill.title);
        }
        for action in &mut actions {
            if action.nays.is_none() {
                action.nays = self.classifier.parse_nays(&action.action);
            }
        }

        let flags = self.classifier.classify(&actions);
        self.joiner.join(JoinInputs {
            bills,
            texts,
            sponsors,
            flags,
        })
    }

    /// Run the pipeline without writing anything
    pub async fn run(&self) -> Result<(Vec<BillRecord>, RunReport)> {
        let era = self.config.era;
        info!(era = %era, input = %self.config.input.display(), "loading sources");

        let mut batch = self.load_sources().await?;
        let mut report = RunReport {
            skipped: batch.skipped,
            rejected: std::mem::take(&mut batch.rejected),
            ..RunReport::default()
        };

        let raw_texts = self.load_texts(&mut report.rejected).await?;
        let texts = self.normalize_texts(raw_texts);

        info!(
            era = %era,
            bills = batch.bills.len(),
            actions = batch.actions.len(),
            texts = texts.len(),
            "building records"
        );

        let records = self.build(batch, texts)?;
        report.rows = records.len();
        report.missing_text = records.iter().filter(|r| r.text.is_none()).count();

        if !report.rejected.is_empty() {
            warn!(count = report.rejected.len(), "records rejected for data quality");
        }

        Ok((records, report))
    }

    /// Run the pipeline and write the era's artifact
    pub async fn run_and_emit(&self) -> Result<RunReport> {
        let (records, mut report) = self.run().await?;
        let emitter = Emitter::new(&self.config.out_dir);
        report.artifact = Some(emitter.emit(self.config.era, &records)?);
        Ok(report)
    }
}
