//! Save orchestration: snapshot the canvas, ask the analyzer for commentary
//! if one is configured, persist the record.
//!
//! Analysis is best-effort and never blocks persistence. Encoding and
//! persistence failures are hard errors for this one save attempt and leave
//! zero records behind; they never end the session.

use std::sync::Arc;

use anyhow::anyhow;
use chrono::Utc;
use thiserror::Error;

use crate::analysis::ImageAnalyzer;
use crate::canvas::Canvas;
use crate::db::DrawingStore;
use crate::models::{NewDrawing, SavedDrawing};

const ENABLE_LOGS: bool = true;
use crate::{log_info, log_warn};

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("failed to encode the drawing snapshot")]
    Encode(#[source] anyhow::Error),
    #[error("failed to persist the drawing")]
    Persist(#[source] anyhow::Error),
}

pub async fn save_drawing<S: DrawingStore>(
    canvas: &Canvas,
    analyzer: Option<Arc<dyn ImageAnalyzer>>,
    store: &S,
) -> Result<SavedDrawing, SaveError> {
    let image_png = canvas.encode_png().map_err(SaveError::Encode)?;

    let (analysis, analysis_warning) = match analyzer {
        Some(analyzer) => run_analysis(analyzer, image_png.clone()).await,
        None => (None, None),
    };

    let created_at = Utc::now();
    let id = store
        .append(NewDrawing {
            image_png,
            analysis: analysis.clone(),
            created_at,
        })
        .await
        .map_err(SaveError::Persist)?;

    log_info!(
        "drawing {id} saved ({} analysis)",
        if analysis.is_some() { "with" } else { "without" }
    );

    Ok(SavedDrawing {
        id,
        analysis,
        analysis_warning,
        created_at,
    })
}

/// Runs the analyzer on a blocking worker. Any failure, including a worker
/// join failure, degrades to "no analysis" with the reason surfaced as a
/// warning.
async fn run_analysis(
    analyzer: Arc<dyn ImageAnalyzer>,
    image_png: Vec<u8>,
) -> (Option<String>, Option<String>) {
    let outcome = tokio::task::spawn_blocking(move || analyzer.analyze(&image_png))
        .await
        .map_err(|err| anyhow!("analysis worker join failed: {err}"))
        .and_then(|result| result.map_err(anyhow::Error::new));

    match outcome {
        Ok(text) => (Some(text), None),
        Err(err) => {
            log_warn!("analysis failed, saving without commentary: {err:#}");
            (None, Some(format!("{err:#}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::AnalysisError;
    use crate::capture::Point;
    use crate::models::DrawingRecord;
    use anyhow::{bail, Result};
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryStore {
        records: Mutex<Vec<DrawingRecord>>,
        fail_append: bool,
    }

    impl MemoryStore {
        fn failing() -> Self {
            Self {
                fail_append: true,
                ..Self::default()
            }
        }

        fn len(&self) -> usize {
            self.records.lock().unwrap().len()
        }
    }

    impl DrawingStore for MemoryStore {
        async fn append(&self, drawing: NewDrawing) -> Result<i64> {
            if self.fail_append {
                bail!("disk full");
            }
            let mut records = self.records.lock().unwrap();
            let id = records.len() as i64 + 1;
            records.push(DrawingRecord {
                id,
                image_png: drawing.image_png,
                analysis: drawing.analysis,
                created_at: drawing.created_at,
            });
            Ok(id)
        }

        async fn list(&self) -> Result<Vec<DrawingRecord>> {
            let mut records = self.records.lock().unwrap().clone();
            records.reverse();
            Ok(records)
        }

        async fn get(&self, id: i64) -> Result<Option<DrawingRecord>> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .iter()
                .find(|r| r.id == id)
                .cloned())
        }
    }

    struct FixedAnalyzer;

    impl ImageAnalyzer for FixedAnalyzer {
        fn analyze(&self, _image_png: &[u8]) -> Result<String, AnalysisError> {
            Ok("a wobbly triangle".to_string())
        }
    }

    struct BrokenAnalyzer;

    impl ImageAnalyzer for BrokenAnalyzer {
        fn analyze(&self, _image_png: &[u8]) -> Result<String, AnalysisError> {
            Err(AnalysisError::Request("connection reset".to_string()))
        }
    }

    fn stroked_canvas() -> Canvas {
        let mut canvas = Canvas::new(32, 32);
        canvas.draw_segment(Point::new(2, 2), Point::new(20, 20), [255, 0, 0], 3);
        canvas
    }

    #[tokio::test]
    async fn save_with_analyzer_persists_commentary() {
        let store = MemoryStore::default();
        let saved = save_drawing(&stroked_canvas(), Some(Arc::new(FixedAnalyzer)), &store)
            .await
            .unwrap();

        assert_eq!(saved.analysis.as_deref(), Some("a wobbly triangle"));
        assert!(saved.analysis_warning.is_none());

        let record = store.get(saved.id).await.unwrap().unwrap();
        assert_eq!(record.analysis.as_deref(), Some("a wobbly triangle"));
    }

    #[tokio::test]
    async fn analyzer_failure_still_persists_the_drawing() {
        let store = MemoryStore::default();
        let saved = save_drawing(&stroked_canvas(), Some(Arc::new(BrokenAnalyzer)), &store)
            .await
            .unwrap();

        assert!(saved.analysis.is_none());
        assert!(saved
            .analysis_warning
            .as_deref()
            .unwrap()
            .contains("connection reset"));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn no_analyzer_is_a_clean_skip() {
        let store = MemoryStore::default();
        let saved = save_drawing(&stroked_canvas(), None, &store).await.unwrap();
        assert!(saved.analysis.is_none());
        assert!(saved.analysis_warning.is_none());
    }

    #[tokio::test]
    async fn persistence_failure_is_hard_and_leaves_no_record() {
        let store = MemoryStore::failing();
        let result = save_drawing(&stroked_canvas(), None, &store).await;

        assert!(matches!(result, Err(SaveError::Persist(_))));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn saved_png_decodes_back_to_the_canvas() {
        let store = MemoryStore::default();
        let canvas = stroked_canvas();
        let saved = save_drawing(&canvas, None, &store).await.unwrap();

        let record = store.get(saved.id).await.unwrap().unwrap();
        let decoded = image::load_from_memory(&record.image_png).unwrap().to_rgb8();
        assert_eq!(decoded.as_raw(), canvas.image().as_raw());
    }
}
