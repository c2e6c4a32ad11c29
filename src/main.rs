extern crate log;
pub mod config;
pub mod drawing;
pub mod error;
pub mod geofile;
pub mod geometry;
pub mod store;
use crate::config::Config;
use crate::drawing::session::{DrawTool, DrawingSession};
use crate::drawing::viewport::HeadlessViewport;
use crate::geofile::exchange::{
    default_export_filename, read_drafts_from_geojson, write_features_to_geojson,
};
use crate::geofile::persistence::{FileSlot, PersistenceAdapter};
use crate::geometry::primitives::LatLon;
use crate::store::feature::{FeatureId, FeatureKind};
use crate::store::feature_store::FeatureStore;
use anyhow::anyhow;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Manage areas of interest drawn on a map, stored as GeoJSON.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the YAML config file.
    #[arg(short, long)]
    config_filepath: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List all features and the total area of the visible ones.
    List,
    /// Draw a feature from points given as LAT,LON.
    Draw {
        #[arg(short, long, value_enum)]
        kind: DrawTool,
        #[arg(short, long = "point", required = true, allow_hyphen_values = true)]
        points: Vec<LatLon>,
    },
    /// Replace the points of a feature. Polygon holes are kept.
    Edit {
        id: u64,
        #[arg(short, long = "point", required = true, allow_hyphen_values = true)]
        points: Vec<LatLon>,
    },
    /// Delete a feature.
    Delete { id: u64 },
    /// Rename a feature. An empty label restores the default one.
    Rename { id: u64, label: String },
    /// Hide a feature, excluding it from the total area.
    Hide { id: u64 },
    /// Show a hidden feature.
    Show { id: u64 },
    /// Delete all features.
    Clear,
    /// Import features from a .geojson or .json file.
    Import { filepath: PathBuf },
    /// Export all features to a GeoJSON file.
    Export {
        /// Defaults to aoi-features-<date>.geojson in the current directory.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

type Session = DrawingSession<HeadlessViewport>;

fn print_features(session: &Session) {
    let store = session.store();
    if store.is_empty() {
        println!("No features");
        return;
    }
    for feature in store.list() {
        let detail = match (feature.kind(), feature.area_sq_km(), feature.anchor()) {
            (FeatureKind::Polygon, Some(area_sq_km), _) => format!("{:.2} km²", area_sq_km),
            (FeatureKind::Marker, _, Some(point)) => format!("at {}", point),
            (_, _, _) => format!("{} points", feature.rings()[0].len()),
        };
        println!(
            "{:>4}  {:<24} {:<9} {:<7} {}",
            feature.id(),
            feature.label(),
            feature.kind(),
            if feature.visible() { "shown" } else { "hidden" },
            detail
        );
    }
    println!(
        "{} features, total area {:.2} km²",
        store.len(),
        store.total_area_sq_km()
    );
}

fn draw(session: &mut Session, kind: DrawTool, points: Vec<LatLon>) -> anyhow::Result<()> {
    session.start_draw(kind)?;
    for point in points {
        session.point_added(point)?;
    }
    let id = session.finish_draw()?;
    if let Some(feature) = session.store().get(id) {
        println!("Created {} '{}' ({})", feature.kind(), feature.label(), id);
    }
    Ok(())
}

fn edit(session: &mut Session, id: FeatureId, points: Vec<LatLon>) -> anyhow::Result<()> {
    let feature = session
        .store()
        .get(id)
        .ok_or_else(|| anyhow!("Feature {} not found", id))?;
    let mut rings = vec![points];
    if feature.kind() == FeatureKind::Polygon {
        rings.extend(feature.rings().iter().skip(1).cloned());
    }
    session.start_edit();
    let result = session.geometry_edited(id, rings);
    session.stop_edit();
    Ok(result?)
}

fn delete(session: &mut Session, id: FeatureId) -> anyhow::Result<()> {
    session.start_delete();
    let removed = session.feature_picked(id);
    session.stop_delete();
    match removed? {
        Some(feature) => println!("Deleted '{}'", feature.label()),
        None => log::warn!("Feature {} does not exist", id),
    }
    Ok(())
}

fn try_main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = Config::load(args.config_filepath.as_deref())?;
    log::debug!("{:?}", config);

    let persistence = PersistenceAdapter::new(
        Box::new(FileSlot::new(&config.data_dir)),
        &config.persistence_key,
    );
    log::info!(
        "Using features stored under '{}' in {:?}",
        persistence.key(),
        config.data_dir
    );
    let store = FeatureStore::open(persistence, config.visible_by_default);
    let mut session = DrawingSession::new(store, HeadlessViewport, config.draw_tools);

    match args.command {
        Command::List => print_features(&session),
        Command::Draw { kind, points } => draw(&mut session, kind, points)?,
        Command::Edit { id, points } => edit(&mut session, FeatureId(id), points)?,
        Command::Delete { id } => delete(&mut session, FeatureId(id))?,
        Command::Rename { id, label } => {
            session.update_store(|store| store.rename(FeatureId(id), &label))?
        }
        Command::Hide { id } => {
            session.update_store(|store| store.set_visible(FeatureId(id), false))?
        }
        Command::Show { id } => {
            session.update_store(|store| store.set_visible(FeatureId(id), true))?
        }
        Command::Clear => session.update_store(|store| store.clear()),
        Command::Import { filepath } => {
            let drafts = read_drafts_from_geojson(&filepath)?;
            let ids = session.import(drafts)?;
            println!("Imported {} features from {:?}", ids.len(), filepath);
        }
        Command::Export { output } => {
            let output_filepath =
                output.unwrap_or_else(|| PathBuf::from(default_export_filename()));
            write_features_to_geojson(session.store().list(), &output_filepath)?;
            println!(
                "Exported {} features to {:?}",
                session.store().len(),
                output_filepath
            );
        }
    }
    Ok(())
}

fn main() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    env_logger::init();
    if let Err(e) = try_main() {
        eprintln!("Error: {:?}", e);
        std::process::exit(1)
    }
}
