use eframe::egui;
use egui::Color32;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::config::Config;
use crate::loader::boundary_loader::BoundaryLoader;
use crate::loader::error::LoadError;
use crate::loader::source::SourceLocator;
use crate::map::map::{Map, ViewRequest};
use crate::map::region::RegionCollection;

/// Collections kept around per source locator.
const COLLECTION_CACHE_SIZE: usize = 8;

type LoadResult = Result<Arc<RegionCollection>, LoadError>;

#[derive(Deserialize, Serialize)]
#[serde(default)]
pub struct DeptoMapApp {
    /// Applied selection, remembered across sessions.
    selection: BTreeSet<String>,
    #[serde(skip)]
    pending: BTreeSet<String>,
    #[serde(skip)]
    collection: Option<Arc<RegionCollection>>,
    #[serde(skip)]
    cache: LruCache<String, Arc<RegionCollection>>,
    #[serde(skip)]
    config: Config,
    #[serde(skip)]
    loader: BoundaryLoader,
    #[serde(skip)]
    loading: bool,
    #[serde(skip)]
    diagnostic: Option<String>,
    #[serde(skip)]
    view_request: Option<ViewRequest>,
    #[serde(skip)]
    receiver: mpsc::UnboundedReceiver<LoadResult>,
    #[serde(skip)]
    sender: mpsc::UnboundedSender<LoadResult>,
    #[serde(skip)]
    runtime: tokio::runtime::Runtime,
}

impl Default for DeptoMapApp {
    fn default() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let config = Config::default();
        Self {
            selection: BTreeSet::new(),
            pending: BTreeSet::new(),
            collection: None,
            cache: LruCache::new(
                NonZeroUsize::new(COLLECTION_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN),
            ),
            loader: BoundaryLoader::new(config.name_field.clone(), config.timeout),
            config,
            loading: false,
            diagnostic: None,
            view_request: None,
            receiver,
            sender,
            runtime: tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .thread_name("boundary-loader")
                .enable_all()
                .build()
                .expect("Unable to create runtime"),
        }
    }
}

impl eframe::App for DeptoMapApp {
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        eframe::set_value(storage, eframe::APP_KEY, self);
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_results();

        egui::SidePanel::left("selector_panel")
            .resizable(false)
            .exact_width(280.0)
            .show(ctx, |ui| {
                self.selector_ui(ui, ctx);
            });

        egui::CentralPanel::default().show(ctx, |ui| match &self.collection {
            Some(collection) => {
                let map = Map::new("boundary_map", collection.as_ref(), &self.selection)
                    .view_request(self.view_request.take());
                ui.add(map);
            }
            None => {
                ui.centered_and_justified(|ui| {
                    ui.label(if self.loading {
                        "Loading boundaries..."
                    } else {
                        "No boundary data loaded."
                    });
                });
            }
        });
    }
}

impl DeptoMapApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: Config) -> Self {
        configure_style(&cc.egui_ctx);

        let mut app: Self = cc
            .storage
            .and_then(|storage| eframe::get_value(storage, eframe::APP_KEY))
            .unwrap_or_default();

        app.loader = BoundaryLoader::new(config.name_field.clone(), config.timeout);
        app.config = config;
        // The checkbox list starts from the remembered selection
        app.pending = app.selection.clone();
        app.start_load(&cc.egui_ctx, false);
        app
    }

    /// Drains finished loads from the background task.
    fn process_results(&mut self) {
        while let Ok(result) = self.receiver.try_recv() {
            self.loading = false;
            match result {
                Ok(collection) => {
                    let key = SourceLocator::parse(&self.config.source).cache_key();
                    self.cache.put(key, collection.clone());
                    self.install_collection(collection);
                }
                Err(error) => {
                    log::error!("boundary load failed: {error}");
                    self.diagnostic = Some(error.to_string());
                }
            }
        }
    }

    /// Serves from the locator-keyed cache when possible, otherwise spawns
    /// one load on the runtime and repaints when the result lands.
    fn start_load(&mut self, ctx: &egui::Context, invalidate: bool) {
        let locator = SourceLocator::parse(&self.config.source);
        let key = locator.cache_key();

        if invalidate {
            self.cache.pop(&key);
        } else if let Some(cached) = self.cache.get(&key).cloned() {
            self.install_collection(cached);
            return;
        }
        if self.loading {
            return;
        }

        self.loading = true;
        self.diagnostic = None;

        let loader = self.loader.clone();
        let sender = self.sender.clone();
        let requester = ctx.clone(); // Uses ARC so can be cloned to the task cheaply
        self.runtime.spawn(async move {
            let result = loader.load(&locator).await;
            let _ = sender.send(result);
            requester.request_repaint();
        });
    }

    fn install_collection(&mut self, collection: Arc<RegionCollection>) {
        // Only known names may stay selected
        self.selection.retain(|name| collection.contains_name(name));
        self.pending.retain(|name| collection.contains_name(name));
        self.collection = Some(collection);
    }

    fn apply_pending(&mut self) {
        self.selection = self.pending.clone();
        let fitted = self
            .collection
            .as_ref()
            .and_then(|c| c.bounds_of(&self.selection));
        self.view_request = Some(match fitted {
            Some(bounds) => ViewRequest::Fit(bounds),
            None => ViewRequest::Reset,
        });
    }

    fn clear_selection(&mut self) {
        self.pending.clear();
        self.selection.clear();
        self.view_request = Some(ViewRequest::Reset);
    }

    fn selector_ui(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        ui.heading("Departments");
        ui.small(self.config.source.clone());
        ui.separator();

        ui.horizontal(|ui| {
            if ui.button("Reload").clicked() {
                self.start_load(ctx, true);
            }
            if self.loading {
                ui.spinner();
                ui.label("Loading...");
            }
        });

        if let Some(diagnostic) = &self.diagnostic {
            ui.colored_label(Color32::LIGHT_RED, diagnostic.as_str());
        }

        ui.separator();

        let Some(collection) = self.collection.clone() else {
            ui.label("No region list yet.");
            return;
        };

        let names = collection.distinct_names();
        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .max_height(ui.available_height() - 72.0)
            .show(ui, |ui| {
                for name in &names {
                    let mut checked = self.pending.contains(name);
                    if ui.checkbox(&mut checked, name.as_str()).changed() {
                        if checked {
                            self.pending.insert(name.clone());
                        } else {
                            self.pending.remove(name);
                        }
                    }
                }
            });

        ui.separator();
        ui.horizontal(|ui| {
            if ui.button("Apply").clicked() {
                self.apply_pending();
            }
            if ui.button("Clear").clicked() {
                self.clear_selection();
            }
        });
        ui.label(format!(
            "{} regions, {} selected",
            collection.len(),
            self.selection.len()
        ));
    }
}

fn configure_style(ctx: &egui::Context) {
    use egui::{FontFamily, FontId, TextStyle};

    let mut style = (*ctx.style()).clone();

    style.text_styles = [
        (TextStyle::Heading, FontId::new(20.0, FontFamily::Proportional)),
        (TextStyle::Body, FontId::new(15.0, FontFamily::Proportional)),
        (TextStyle::Monospace, FontId::new(13.0, FontFamily::Monospace)),
        (TextStyle::Button, FontId::new(15.0, FontFamily::Proportional)),
        (TextStyle::Small, FontId::new(11.0, FontFamily::Proportional)),
    ]
    .into();

    style.visuals = egui::Visuals::dark();
    style.visuals.panel_fill = Color32::from_rgb(32, 33, 36);
    style.visuals.selection = egui::style::Selection {
        bg_fill: Color32::from_rgb(75, 75, 75),
        stroke: egui::Stroke::new(1.0, Color32::WHITE),
    };

    ctx.set_style(style);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::region::Region;
    use geo_types::{polygon, MultiPolygon};

    fn square(name: &str, x: f64, y: f64) -> Region {
        let poly = polygon![
            (x: x, y: y),
            (x: x + 1.0, y: y),
            (x: x + 1.0, y: y + 1.0),
            (x: x, y: y + 1.0),
            (x: x, y: y),
        ];
        Region::new(name, MultiPolygon(vec![poly])).expect("square has extent")
    }

    fn collection() -> Arc<RegionCollection> {
        Arc::new(RegionCollection::new(vec![
            square("ANTIOQUIA", 0.0, 0.0),
            square("BOYACA", 3.0, 0.0),
        ]))
    }

    #[test]
    fn loaded_collection_prunes_unknown_selections() {
        let mut app = DeptoMapApp::default();
        app.selection = ["ANTIOQUIA".to_string(), "NARNIA".to_string()].into();
        app.pending = app.selection.clone();

        app.install_collection(collection());

        assert_eq!(app.selection, ["ANTIOQUIA".to_string()].into());
        assert_eq!(app.pending, ["ANTIOQUIA".to_string()].into());
    }

    #[test]
    fn apply_fits_the_view_to_the_selection() {
        let mut app = DeptoMapApp::default();
        app.install_collection(collection());
        app.pending = ["BOYACA".to_string()].into();

        app.apply_pending();

        assert_eq!(app.selection, ["BOYACA".to_string()].into());
        match &app.view_request {
            Some(ViewRequest::Fit(bounds)) => {
                assert_eq!(bounds.west(), 3.0);
                assert_eq!(bounds.east(), 4.0);
            }
            other => panic!("expected a fit request, got {other:?}"),
        }
    }

    #[test]
    fn applying_an_empty_selection_resets_the_view() {
        let mut app = DeptoMapApp::default();
        app.install_collection(collection());

        app.apply_pending();

        assert!(app.selection.is_empty());
        assert!(matches!(app.view_request, Some(ViewRequest::Reset)));
    }

    #[test]
    fn clear_forgets_the_selection_and_view() {
        let mut app = DeptoMapApp::default();
        app.install_collection(collection());
        app.pending = ["ANTIOQUIA".to_string()].into();
        app.apply_pending();

        app.clear_selection();

        assert!(app.selection.is_empty());
        assert!(app.pending.is_empty());
        assert!(matches!(app.view_request, Some(ViewRequest::Reset)));
    }
}
