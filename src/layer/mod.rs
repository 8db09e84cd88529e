//! Test layers: shared fixtures set up once for a group of tests.
//!
//! A [`Layer`] names the layers it builds on. [`LayerStack`] sets bases up
//! before their dependents, each layer once, and tears everything down in
//! reverse order. Layers exchange fixtures through [`Resources`], a
//! string-keyed map with typed lookup.

pub mod directives;

use std::any::Any;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::info;

use crate::error::{Error, Result};

#[derive(Default)]
pub struct Resources {
    items: IndexMap<String, Box<dyn Any>>,
}

impl Resources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T: Any>(&mut self, name: &str, value: T) {
        self.items.insert(name.to_string(), Box::new(value));
    }

    pub fn get<T: Any>(&self, name: &str) -> Result<&T> {
        self.items
            .get(name)
            .and_then(|item| item.downcast_ref::<T>())
            .ok_or_else(|| Error::Layer(format!("resource {name:?} is not available")))
    }

    pub fn get_mut<T: Any>(&mut self, name: &str) -> Result<&mut T> {
        self.items
            .get_mut(name)
            .and_then(|item| item.downcast_mut::<T>())
            .ok_or_else(|| Error::Layer(format!("resource {name:?} is not available")))
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.items.shift_remove(name).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.items.contains_key(name)
    }
}

pub trait Layer {
    fn name(&self) -> &str;

    fn bases(&self) -> Vec<Rc<dyn Layer>> {
        Vec::new()
    }

    fn set_up(&self, _resources: &mut Resources) -> Result<()> {
        Ok(())
    }

    fn tear_down(&self, _resources: &mut Resources) -> Result<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct LayerStack {
    resources: Resources,
    active: Vec<Rc<dyn Layer>>,
}

impl LayerStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resources(&self) -> &Resources {
        &self.resources
    }

    pub fn resources_mut(&mut self) -> &mut Resources {
        &mut self.resources
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.active.iter().any(|l| l.name() == name)
    }

    /// Sets up `layer` after any of its bases that are not active yet.
    pub fn set_up(&mut self, layer: Rc<dyn Layer>) -> Result<()> {
        for base in layer.bases() {
            self.set_up(base)?;
        }
        if self.is_active(layer.name()) {
            return Ok(());
        }

        info!(layer = layer.name(), "setting up layer");
        layer.set_up(&mut self.resources)?;
        self.active.push(layer);
        Ok(())
    }

    /// Tears active layers down, most recent first.
    pub fn tear_down(&mut self) -> Result<()> {
        while let Some(layer) = self.active.pop() {
            info!(layer = layer.name(), "tearing down layer");
            layer.tear_down(&mut self.resources)?;
        }
        Ok(())
    }
}
