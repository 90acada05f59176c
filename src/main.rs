//! Headless demo of the cooperative-loop shape: a scripted pinch draws a
//! square, the drawing is saved to a temporary SQLite database, and the
//! history listing is printed. No camera or analysis credentials needed.

use anyhow::Result;
use log::info;

use airsketch::capture::ScriptedCapture;
use airsketch::session::{save_drawing, ActionOutcome, DrawSession, UserAction};
use airsketch::{Canvas, Database, DrawConfig, DrawingStore, FingertipSample, Point};

fn pinched(index: Point) -> FingertipSample {
    // Thumb 10 px from the index tip: inside the default 20 px pinch band.
    FingertipSample::present(Point::new(index.x + 10, index.y), index)
}

fn square_path() -> Vec<FingertipSample> {
    let corners = [
        Point::new(100, 100),
        Point::new(300, 100),
        Point::new(300, 300),
        Point::new(100, 300),
        Point::new(100, 100),
    ];

    let mut samples = Vec::new();
    for pair in corners.windows(2) {
        for step in 0..10 {
            let t = step as f32 / 10.0;
            let x = pair[0].x as f32 + t * (pair[1].x - pair[0].x) as f32;
            let y = pair[0].y as f32 + t * (pair[1].y - pair[0].y) as f32;
            samples.push(pinched(Point::new(x as i32, y as i32)));
        }
    }
    // Spread past the release threshold to end the stroke.
    samples.push(FingertipSample::present(
        Point::new(100, 100),
        Point::new(300, 300),
    ));
    samples
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let config = DrawConfig::default();
    config.validate()?;

    let db_path = std::env::temp_dir().join(format!(
        "airsketch-demo-{}.sqlite3",
        uuid::Uuid::new_v4()
    ));
    let db = Database::new(db_path)?;

    let mut session = DrawSession::new(config);
    info!("session {} drawing a square", session.id());

    let mut capture = ScriptedCapture::new(640, 480, square_path());
    while let Some((frame, sample)) = capture.next() {
        session.process_frame(&frame, &sample);
    }

    let painted = session
        .canvas()
        .map(Canvas::painted_pixel_count)
        .unwrap_or(0);
    info!("canvas has {painted} painted pixels");

    match session.handle_action(UserAction::Save) {
        ActionOutcome::SaveStarted(snapshot) => {
            let result = save_drawing(&snapshot, None, &db).await;
            session.finish_save(&result);
            let saved = result?;
            println!("saved drawing id {}", saved.id);
        }
        other => anyhow::bail!("save was not accepted: {other:?}"),
    }

    session.handle_action(UserAction::ViewHistory);
    for record in db.list().await? {
        println!(
            "#{} {} bytes, saved {}, analysis: {}",
            record.id,
            record.image_png.len(),
            record.created_at.to_rfc3339(),
            record.analysis.as_deref().unwrap_or("(none)"),
        );
    }
    session.handle_action(UserAction::Clear);

    Ok(())
}
