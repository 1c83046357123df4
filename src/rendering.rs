use crate::reader::Label;

pub type HoverCallback = Box<dyn Fn(Option<&Label>) + Send>;
pub type ClickCallback = Box<dyn Fn(&Label) + Send>;

/// Event-subscription surface of the globe widget. The widget consumes a
/// finite point set and emits hover/click events carrying the touched
/// item; everything else about rendering stays on the widget's side of the
/// boundary.
pub trait GlobeView {
    fn set_points(&mut self, points: Vec<Label>);
    fn on_hover(&mut self, callback: HoverCallback);
    fn on_click(&mut self, callback: ClickCallback);
}

/// Widget-independent adapter: holds the current point set and dispatches
/// events to the registered callbacks. A concrete embedding drives it from
/// its own event loop.
#[derive(Default)]
pub struct HeadlessGlobe {
    points: Vec<Label>,
    hover: Option<HoverCallback>,
    click: Option<ClickCallback>,
}

impl HeadlessGlobe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn points(&self) -> &[Label] {
        &self.points
    }

    /// Dispatch a hover event; `None` means the pointer left all points.
    pub fn emit_hover(&self, index: Option<usize>) {
        if let Some(callback) = &self.hover {
            callback(index.and_then(|i| self.points.get(i)));
        }
    }

    /// Dispatch a click on one point. Returns false when the index is out
    /// of range or no callback is registered.
    pub fn emit_click(&self, index: usize) -> bool {
        match (&self.click, self.points.get(index)) {
            (Some(callback), Some(label)) => {
                callback(label);
                true
            }
            _ => false,
        }
    }
}

impl GlobeView for HeadlessGlobe {
    fn set_points(&mut self, points: Vec<Label>) {
        self.points = points;
    }

    fn on_hover(&mut self, callback: HoverCallback) {
        self.hover = Some(callback);
    }

    fn on_click(&mut self, callback: ClickCallback) {
        self.click = Some(callback);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use chrono::Utc;
    use crate::client::GlobeClient;
    use crate::entities::{Location, Picture};
    use crate::reader::load_labels;
    use crate::storage::InMemoryStorage;

    #[tokio::test]
    async fn test_globe_receives_labels_and_dispatches_events() {
        let client = GlobeClient::new(InMemoryStorage::default());
        let location = Location::new("paris".into(), "summer trip".into(), 48.8566, 2.3522, Utc::now());
        let location = client.resolve_location(location).await.unwrap().safe_unwrap();
        let picture = Picture::new(location.id, "image.png".into(), "http://x/image.png".into(), None);
        client.add_picture(picture).await.unwrap();

        let mut globe = HeadlessGlobe::new();
        globe.set_points(load_labels(&client).await.unwrap().collect());
        assert_eq!(globe.points().len(), 1);

        let hovered = Arc::new(Mutex::new(Vec::new()));
        let clicked = Arc::new(Mutex::new(Vec::new()));
        let hover_log = Arc::clone(&hovered);
        globe.on_hover(Box::new(move |label| {
            hover_log.lock().unwrap().push(label.map(|l| l.text.clone()));
        }));
        let click_log = Arc::clone(&clicked);
        globe.on_click(Box::new(move |label| {
            click_log.lock().unwrap().push(label.picture.len());
        }));

        globe.emit_hover(Some(0));
        globe.emit_hover(None);
        assert!(globe.emit_click(0));
        assert!(!globe.emit_click(7));

        assert_eq!(*hovered.lock().unwrap(), [Some("paris".to_string()), None]);
        assert_eq!(*clicked.lock().unwrap(), [1]);
    }
}
