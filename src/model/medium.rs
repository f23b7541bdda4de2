//! Medium helpers: locations, base media and parent chains
//!
//! A medium's `base` and `parent` properties point at other media; the class
//! declares aliases for them because the property names alone would never
//! fuzzy-match the `Medium` interface. Parent chains are acyclic on the
//! server side, which the recursive helpers rely on.

use std::ops::Deref;
use std::path::PathBuf;

use crate::error::Result;
use crate::model::{property_string, Model, Property};
use crate::naming::split_pascal_case;

/// A medium model with hierarchy helpers
#[derive(Clone, Debug)]
pub struct Medium {
    model: Model,
}

impl Medium {
    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn into_model(self) -> Model {
        self.model
    }

    pub fn name(&self) -> Result<String> {
        property_string(&self.model, "name")
    }

    pub fn id(&self) -> Result<String> {
        property_string(&self.model, "id")
    }

    /// Physical location of the medium as a path.
    pub fn location(&self) -> Result<PathBuf> {
        Ok(PathBuf::from(property_string(&self.model, "location")?))
    }

    /// The base medium of a snapshot chain (the medium itself when it has
    /// no base of its own).
    pub fn base_medium(&self) -> Result<Medium> {
        match self.model.get("base")? {
            Property::Model(base) => Ok(Medium::from(base)),
            _ => Ok(self.clone()),
        }
    }

    /// Parents of this medium, nearest first.
    pub fn parents(&self, include_self: bool) -> Result<Vec<Medium>> {
        let mut parents = Vec::new();
        if include_self {
            parents.push(self.clone());
        }
        let mut medium = self.clone();
        while let Property::Model(parent) = medium.model.get("parent")? {
            let parent = Medium::from(parent);
            parents.push(parent.clone());
            medium = parent;
        }
        Ok(parents)
    }

    /// All descendants of this medium, depth first.
    pub fn all_children(&self) -> Result<Vec<Medium>> {
        let mut children = Vec::new();
        if let Property::List(items) = self.model.get("children")? {
            for item in items {
                if let Property::Model(model) = item {
                    let child = Medium::from(model);
                    children.extend(child.all_children()?);
                    children.push(child);
                }
            }
        }
        Ok(children)
    }

    /// The device type as a display name (`HardDisk` becomes `Hard Disk`).
    pub fn device_type_name(&self) -> Result<String> {
        Ok(split_pascal_case(&property_string(
            &self.model,
            "device_type",
        )?))
    }
}

impl From<Model> for Medium {
    fn from(model: Model) -> Self {
        Self { model }
    }
}

impl Deref for Medium {
    type Target = Model;

    fn deref(&self) -> &Model {
        &self.model
    }
}
