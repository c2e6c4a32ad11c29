use std::fmt;

use clap::ValueEnum;
use serde::Deserialize;

use crate::{
    error::{AoiError, Result},
    geometry::primitives::{LatLon, Ring},
    store::{
        feature::{Feature, FeatureDraft, FeatureId, FeatureKind},
        feature_store::FeatureStore,
    },
};

use super::viewport::MapViewport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DrawTool {
    Polygon,
    Polyline,
    /// Two opposite corners, committed as a four-corner polygon.
    Rectangle,
    Marker,
}

impl DrawTool {
    pub fn all() -> Vec<DrawTool> {
        vec![
            DrawTool::Polygon,
            DrawTool::Polyline,
            DrawTool::Rectangle,
            DrawTool::Marker,
        ]
    }

    pub fn feature_kind(&self) -> FeatureKind {
        match self {
            DrawTool::Polygon | DrawTool::Rectangle => FeatureKind::Polygon,
            DrawTool::Polyline => FeatureKind::Polyline,
            DrawTool::Marker => FeatureKind::Marker,
        }
    }
}

impl fmt::Display for DrawTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DrawTool::Polygon => "polygon",
            DrawTool::Polyline => "polyline",
            DrawTool::Rectangle => "rectangle",
            DrawTool::Marker => "marker",
        };
        write!(f, "{}", name)
    }
}

/// At most one interaction mode is active at a time. `Idle` is both the initial state and the
/// state between interactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Drawing(DrawTool),
    Editing,
    Deleting,
}

fn rectangle_ring(corners: &[LatLon]) -> Result<Ring> {
    match corners {
        [a, b] if a.lat != b.lat && a.lon != b.lon => Ok(vec![
            *a,
            LatLon::new(a.lat, b.lon),
            *b,
            LatLon::new(b.lat, a.lon),
        ]),
        _ => Err(AoiError::InvalidGeometry(format!(
            "Rectangle needs two corners differing in latitude and longitude, got {:?}",
            corners
        ))),
    }
}

/// Controller for draw, edit and delete interactions. Commits finished interactions to the
/// feature store and keeps the viewport in sync with it.
pub struct DrawingSession<V: MapViewport> {
    state: SessionState,
    in_progress: Ring,
    enabled_tools: Vec<DrawTool>,
    store: FeatureStore,
    viewport: V,
}

impl<V: MapViewport> DrawingSession<V> {
    pub fn new(store: FeatureStore, viewport: V, enabled_tools: Vec<DrawTool>) -> Self {
        let mut session = Self {
            state: SessionState::Idle,
            in_progress: Vec::new(),
            enabled_tools,
            store,
            viewport,
        };
        session.render();
        session
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn store(&self) -> &FeatureStore {
        &self.store
    }

    pub fn viewport(&self) -> &V {
        &self.viewport
    }

    /// Points collected so far by the active draw tool.
    pub fn in_progress(&self) -> &[LatLon] {
        &self.in_progress
    }

    fn render(&mut self) {
        self.viewport.render(self.store.list());
    }

    /// Return to `Idle`, dropping whatever the active mode had collected.
    fn leave_mode(&mut self) {
        match self.state {
            SessionState::Idle => return,
            SessionState::Drawing(_) => {
                self.in_progress.clear();
                self.viewport.disarm_draw();
            }
            SessionState::Editing => self.viewport.set_editing(false),
            SessionState::Deleting => self.viewport.set_deleting(false),
        }
        log::debug!("Leaving {:?}", self.state);
        self.state = SessionState::Idle;
    }

    fn invalid_state(&self, event: &'static str) -> AoiError {
        AoiError::InvalidState {
            state: self.state,
            event,
        }
    }

    pub fn start_draw(&mut self, tool: DrawTool) -> Result<()> {
        if !self.enabled_tools.contains(&tool) {
            return Err(AoiError::ToolDisabled(tool.to_string()));
        }
        self.leave_mode();
        self.state = SessionState::Drawing(tool);
        self.viewport.arm_draw(tool);
        log::debug!("Entering {:?}", self.state);
        Ok(())
    }

    pub fn point_added(&mut self, point: LatLon) -> Result<()> {
        let tool = match self.state {
            SessionState::Drawing(tool) => tool,
            _ => return Err(self.invalid_state("add a point")),
        };
        match tool {
            DrawTool::Marker => self.in_progress = vec![point],
            // The second corner follows the pointer until the draw is finished.
            DrawTool::Rectangle if self.in_progress.len() == 2 => self.in_progress[1] = point,
            _ => self.in_progress.push(point),
        }
        Ok(())
    }

    /// Commit the collected points as a new feature. On failure the draw is dropped and the
    /// session is back to `Idle` all the same.
    pub fn finish_draw(&mut self) -> Result<FeatureId> {
        let tool = match self.state {
            SessionState::Drawing(tool) => tool,
            _ => return Err(self.invalid_state("finish drawing")),
        };
        let points = std::mem::take(&mut self.in_progress);
        self.leave_mode();

        let ring = match tool {
            DrawTool::Rectangle => rectangle_ring(&points),
            _ => Ok(points),
        };
        let created = ring.and_then(|ring| {
            self.store
                .create(tool.feature_kind(), vec![ring], None)
                .map(Feature::id)
        });
        match created {
            Ok(id) => {
                log::info!("Committed {} as feature {}", tool, id);
                self.render();
                Ok(id)
            }
            Err(err) => {
                log::debug!("Dropped {} draw: {}", tool, err);
                Err(err)
            }
        }
    }

    /// Discard the draw in progress, if any. The store is not touched.
    pub fn cancel_draw(&mut self) {
        if let SessionState::Drawing(_) = self.state {
            self.leave_mode();
        }
    }

    /// The viewport finished a geometry with `tool` on its own, e.g. from a drag gesture.
    pub fn geometry_drawn(&mut self, tool: DrawTool, ring: Ring) -> Result<FeatureId> {
        if self.state != SessionState::Drawing(tool) {
            return Err(self.invalid_state("commit a drawn geometry"));
        }
        for point in ring {
            self.point_added(point)?;
        }
        self.finish_draw()
    }

    pub fn start_edit(&mut self) {
        self.leave_mode();
        self.state = SessionState::Editing;
        self.viewport.set_editing(true);
        log::debug!("Entering {:?}", self.state);
    }

    pub fn stop_edit(&mut self) {
        if self.state == SessionState::Editing {
            self.leave_mode();
        }
    }

    pub fn toggle_edit(&mut self) {
        match self.state {
            SessionState::Editing => self.stop_edit(),
            _ => self.start_edit(),
        }
    }

    /// Route a geometry change of an existing feature to the store. Only accepted while editing.
    pub fn geometry_edited(&mut self, id: FeatureId, rings: Vec<Ring>) -> Result<()> {
        if self.state != SessionState::Editing {
            return Err(self.invalid_state("edit a feature"));
        }
        let result = self.store.update(id, rings);
        // Also on failure, so that the viewport drops the rejected geometry.
        self.render();
        result
    }

    pub fn start_delete(&mut self) {
        self.leave_mode();
        self.state = SessionState::Deleting;
        self.viewport.set_deleting(true);
        log::debug!("Entering {:?}", self.state);
    }

    pub fn stop_delete(&mut self) {
        if self.state == SessionState::Deleting {
            self.leave_mode();
        }
    }

    pub fn toggle_delete(&mut self) {
        match self.state {
            SessionState::Deleting => self.stop_delete(),
            _ => self.start_delete(),
        }
    }

    /// Remove the picked feature. Only accepted while deleting.
    pub fn feature_picked(&mut self, id: FeatureId) -> Result<Option<Feature>> {
        if self.state != SessionState::Deleting {
            return Err(self.invalid_state("delete a feature"));
        }
        let removed = self.store.remove(id);
        self.render();
        Ok(removed)
    }

    /// Run a list operation (rename, visibility, removal, clear) on the store and re-render.
    pub fn update_store<R>(&mut self, operation: impl FnOnce(&mut FeatureStore) -> R) -> R {
        let result = operation(&mut self.store);
        self.render();
        result
    }

    /// Add imported drafts to the store, all or none, and bring them into view.
    pub fn import(&mut self, drafts: Vec<FeatureDraft>) -> Result<Vec<FeatureId>> {
        let ids = self.store.import(drafts)?;
        self.render();
        if let Some(bounds) = self.store.bounds(Some(&ids)) {
            self.viewport.fit_bounds(bounds);
        }
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use rstest::{fixture, rstest};

    use crate::{
        drawing::viewport::MapViewport,
        error::AoiError,
        geofile::persistence::{MemorySlot, PersistenceAdapter},
        geometry::primitives::LatLon,
        store::{
            feature::{Feature, FeatureDraft, FeatureId, FeatureKind},
            feature_store::FeatureStore,
        },
    };

    use super::{DrawTool, DrawingSession, SessionState};

    /// Viewport that remembers what it was last asked to do.
    #[derive(Default)]
    struct RecordingViewport {
        armed: Option<DrawTool>,
        editing: bool,
        deleting: bool,
        renders: usize,
        rendered_ids: Vec<FeatureId>,
        fitted: Option<geo::Rect>,
    }

    impl MapViewport for RecordingViewport {
        fn arm_draw(&mut self, tool: DrawTool) {
            self.armed = Some(tool);
        }

        fn disarm_draw(&mut self) {
            self.armed = None;
        }

        fn set_editing(&mut self, enabled: bool) {
            self.editing = enabled;
        }

        fn set_deleting(&mut self, enabled: bool) {
            self.deleting = enabled;
        }

        fn render(&mut self, features: &[Feature]) {
            self.renders += 1;
            self.rendered_ids = features.iter().map(Feature::id).collect();
        }

        fn fit_bounds(&mut self, bounds: geo::Rect) {
            self.fitted = Some(bounds);
        }
    }

    type TestSession = DrawingSession<RecordingViewport>;

    fn square() -> Vec<LatLon> {
        vec![
            LatLon::new(0.0, 0.0),
            LatLon::new(0.0, 0.01),
            LatLon::new(0.01, 0.01),
            LatLon::new(0.01, 0.0),
        ]
    }

    #[fixture]
    fn session() -> TestSession {
        DrawingSession::new(
            FeatureStore::new(true),
            RecordingViewport::default(),
            DrawTool::all(),
        )
    }

    fn draw(session: &mut TestSession, tool: DrawTool, points: &[LatLon]) -> FeatureId {
        session.start_draw(tool).unwrap();
        for point in points {
            session.point_added(*point).unwrap();
        }
        session.finish_draw().unwrap()
    }

    #[rstest]
    fn test_draw_polygon(mut session: TestSession) {
        session.start_draw(DrawTool::Polygon).unwrap();
        assert_eq!(SessionState::Drawing(DrawTool::Polygon), session.state());
        assert_eq!(Some(DrawTool::Polygon), session.viewport().armed);
        for point in square() {
            session.point_added(point).unwrap();
        }
        assert_eq!(4, session.in_progress().len());

        let id = session.finish_draw().unwrap();
        assert_eq!(SessionState::Idle, session.state());
        assert_eq!(None, session.viewport().armed);
        assert!(session.in_progress().is_empty());
        assert_eq!(vec![id], session.viewport().rendered_ids);

        let feature = session.store().get(id).unwrap();
        assert_eq!(FeatureKind::Polygon, feature.kind());
        assert_eq!("Area 1", feature.label());
        assert_relative_eq!(1.23, feature.area_sq_km().unwrap(), max_relative = 0.05);
    }

    #[rstest]
    fn test_draw_polyline(mut session: TestSession) {
        let id = draw(
            &mut session,
            DrawTool::Polyline,
            &[LatLon::new(50.9, 6.9), LatLon::new(51.0, 7.0)],
        );
        let feature = session.store().get(id).unwrap();
        assert_eq!(FeatureKind::Polyline, feature.kind());
        assert!(feature.area_sq_km().is_none());
    }

    #[rstest]
    #[case(DrawTool::Polygon, 2)]
    #[case(DrawTool::Polyline, 1)]
    #[case(DrawTool::Marker, 0)]
    #[case(DrawTool::Rectangle, 1)]
    fn test_finish_with_too_few_points(
        mut session: TestSession,
        #[case] tool: DrawTool,
        #[case] num_points: usize,
    ) {
        session.start_draw(tool).unwrap();
        for point in square().into_iter().take(num_points) {
            session.point_added(point).unwrap();
        }
        assert!(matches!(
            session.finish_draw(),
            Err(AoiError::InvalidGeometry(_))
        ));
        assert_eq!(SessionState::Idle, session.state());
        assert_eq!(None, session.viewport().armed);
        assert!(session.store().is_empty());

        // The failed draw is not retried.
        assert!(matches!(
            session.finish_draw(),
            Err(AoiError::InvalidState { .. })
        ));
    }

    #[rstest]
    fn test_rectangle_from_corners(mut session: TestSession) {
        session.start_draw(DrawTool::Rectangle).unwrap();
        session.point_added(LatLon::new(0.0, 0.0)).unwrap();
        session.point_added(LatLon::new(0.5, 0.5)).unwrap();
        // Dragging moves the second corner.
        session.point_added(LatLon::new(0.01, 0.01)).unwrap();
        let id = session.finish_draw().unwrap();

        let feature = session.store().get(id).unwrap();
        assert_eq!(FeatureKind::Polygon, feature.kind());
        assert_eq!(4, feature.rings()[0].len());
        assert_relative_eq!(1.23, feature.area_sq_km().unwrap(), max_relative = 0.05);
    }

    #[rstest]
    fn test_degenerate_rectangle(mut session: TestSession) {
        session.start_draw(DrawTool::Rectangle).unwrap();
        session.point_added(LatLon::new(0.0, 0.0)).unwrap();
        session.point_added(LatLon::new(0.0, 1.0)).unwrap();
        assert!(matches!(
            session.finish_draw(),
            Err(AoiError::InvalidGeometry(_))
        ));
    }

    #[rstest]
    fn test_marker_keeps_last_point(mut session: TestSession) {
        let id = draw(
            &mut session,
            DrawTool::Marker,
            &[LatLon::new(1.0, 1.0), LatLon::new(2.0, 3.0)],
        );
        let feature = session.store().get(id).unwrap();
        assert_eq!(FeatureKind::Marker, feature.kind());
        assert_eq!(Some(LatLon::new(2.0, 3.0)), feature.anchor());
    }

    #[rstest]
    fn test_new_draw_discards_previous(mut session: TestSession) {
        session.start_draw(DrawTool::Polyline).unwrap();
        session.point_added(LatLon::new(1.0, 1.0)).unwrap();
        session.start_draw(DrawTool::Polygon).unwrap();
        assert!(session.in_progress().is_empty());
        assert_eq!(Some(DrawTool::Polygon), session.viewport().armed);
        assert!(session.store().is_empty());
    }

    #[test]
    fn test_cancel_does_not_persist() {
        let slot = MemorySlot::default();
        let store = FeatureStore::open(PersistenceAdapter::new(Box::new(slot.clone()), "aoi"), true);
        let mut session = DrawingSession::new(store, RecordingViewport::default(), DrawTool::all());

        session.start_draw(DrawTool::Polygon).unwrap();
        for point in square() {
            session.point_added(point).unwrap();
        }
        session.cancel_draw();

        assert_eq!(SessionState::Idle, session.state());
        assert!(session.store().is_empty());
        assert_eq!(0, slot.writes.get());

        draw(&mut session, DrawTool::Polygon, &square());
        assert_eq!(1, slot.writes.get());
    }

    #[rstest]
    fn test_events_in_wrong_state(mut session: TestSession) {
        assert!(matches!(
            session.point_added(LatLon::new(0.0, 0.0)),
            Err(AoiError::InvalidState {
                state: SessionState::Idle,
                ..
            })
        ));
        session.start_delete();
        assert!(matches!(
            session.geometry_edited(FeatureId(1), vec![square()]),
            Err(AoiError::InvalidState {
                state: SessionState::Deleting,
                ..
            })
        ));
        session.start_edit();
        assert!(matches!(
            session.feature_picked(FeatureId(1)),
            Err(AoiError::InvalidState { .. })
        ));
        assert!(matches!(
            session.geometry_drawn(DrawTool::Polygon, square()),
            Err(AoiError::InvalidState { .. })
        ));
        // Cancelling outside of a draw changes nothing.
        session.cancel_draw();
        assert_eq!(SessionState::Editing, session.state());
    }

    #[test]
    fn test_disabled_tool() {
        let mut session = DrawingSession::new(
            FeatureStore::new(true),
            RecordingViewport::default(),
            vec![DrawTool::Polygon],
        );
        session.start_edit();
        assert!(matches!(
            session.start_draw(DrawTool::Marker),
            Err(AoiError::ToolDisabled(_))
        ));
        assert_eq!(SessionState::Editing, session.state());
    }

    #[rstest]
    fn test_edit_mode(mut session: TestSession) {
        let id = draw(&mut session, DrawTool::Polygon, &square());
        let before = session.store().total_area_sq_km();

        session.toggle_edit();
        assert_eq!(SessionState::Editing, session.state());
        assert!(session.viewport().editing);

        let larger: Vec<LatLon> = square()
            .into_iter()
            .map(|point| LatLon::new(point.lat * 2.0, point.lon * 2.0))
            .collect();
        session.geometry_edited(id, vec![larger]).unwrap();
        assert!(session.store().total_area_sq_km() > before);

        assert!(matches!(
            session.geometry_edited(FeatureId(99), vec![square()]),
            Err(AoiError::NotFound(_))
        ));
        assert!(matches!(
            session.geometry_edited(id, vec![square()[..2].to_vec()]),
            Err(AoiError::InvalidGeometry(_))
        ));
        assert_eq!(SessionState::Editing, session.state());

        session.toggle_edit();
        assert_eq!(SessionState::Idle, session.state());
        assert!(!session.viewport().editing);
    }

    #[rstest]
    fn test_delete_mode(mut session: TestSession) {
        let first = draw(&mut session, DrawTool::Polygon, &square());
        let second = draw(&mut session, DrawTool::Marker, &[LatLon::new(1.0, 1.0)]);

        session.start_edit();
        session.toggle_delete();
        assert_eq!(SessionState::Deleting, session.state());
        assert!(!session.viewport().editing);
        assert!(session.viewport().deleting);

        let removed = session.feature_picked(first).unwrap().unwrap();
        assert_eq!(first, removed.id());
        assert!(session.feature_picked(first).unwrap().is_none());
        assert_eq!(vec![second], session.viewport().rendered_ids);

        session.stop_delete();
        assert_eq!(SessionState::Idle, session.state());
        assert!(!session.viewport().deleting);
    }

    #[rstest]
    fn test_geometry_drawn(mut session: TestSession) {
        session.start_draw(DrawTool::Polyline).unwrap();
        let id = session
            .geometry_drawn(
                DrawTool::Polyline,
                vec![LatLon::new(0.0, 0.0), LatLon::new(1.0, 1.0)],
            )
            .unwrap();
        assert_eq!(FeatureKind::Polyline, session.store().get(id).unwrap().kind());
        assert_eq!(SessionState::Idle, session.state());
    }

    #[rstest]
    fn test_update_store_renders(mut session: TestSession) {
        let id = draw(&mut session, DrawTool::Polygon, &square());
        let renders = session.viewport().renders;
        session
            .update_store(|store| store.set_visible(id, false))
            .unwrap();
        assert_eq!(renders + 1, session.viewport().renders);
        assert_eq!(0.0, session.store().total_area_sq_km());

        session.update_store(|store| store.clear());
        assert!(session.viewport().rendered_ids.is_empty());
    }

    #[rstest]
    fn test_import_fits_bounds(mut session: TestSession) {
        draw(&mut session, DrawTool::Marker, &[LatLon::new(-40.0, -40.0)]);
        let ids = session
            .import(vec![FeatureDraft::new(
                FeatureKind::Polyline,
                vec![vec![LatLon::new(50.9, 6.9), LatLon::new(51.0, 7.0)]],
            )])
            .unwrap();
        assert_eq!(vec![FeatureId(2)], ids);
        let fitted = session.viewport().fitted.unwrap();
        assert_eq!(6.9, fitted.min().x);
        assert_eq!(51.0, fitted.max().y);

        let result = session.import(vec![FeatureDraft::new(FeatureKind::Polygon, vec![])]);
        assert!(matches!(result, Err(AoiError::InvalidGeometry(_))));
        assert_eq!(2, session.store().len());
    }
}
