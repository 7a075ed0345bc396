/*!

Tag-based safety checks. Whether a resource was created by this tool, and whether a cluster owns
its VPC, is decided only by the tags the cloud provider holds right now. Nothing is cached.

!*/

use crate::constants::{CREATED_BY_TAG, CREATED_BY_VALUE, HOSTING_ISOLATED, HOSTING_TAG, NAME_TAG};
use crate::error::{self, Result};
use crate::gateway::{CloudGateway, ResourceRef, Tags};
use log::debug;
use snafu::ResultExt;

pub struct TagGuard<'a, G: ?Sized> {
    gateway: &'a G,
}

impl<'a, G> TagGuard<'a, G>
where
    G: CloudGateway + ?Sized,
{
    pub fn new(gateway: &'a G) -> Self {
        Self { gateway }
    }

    /// The current value of `key` on `resource`, `None` if the tag is absent.
    pub async fn tag_value(&self, resource: &ResourceRef, key: &str) -> Result<Option<String>> {
        let tags = self
            .gateway
            .resource_tags(resource)
            .await
            .context(error::InspectSnafu {
                what: format!("tags of {}", resource),
            })?;
        Ok(tags.get(key).cloned())
    }

    pub async fn has_tag(&self, resource: &ResourceRef, key: &str, value: &str) -> Result<bool> {
        let found = self.tag_value(resource, key).await?;
        debug!("{} tag '{}' is {:?}", resource, key, found);
        Ok(found.as_deref() == Some(value))
    }

    pub async fn is_created_by_tool(&self, resource: &ResourceRef) -> Result<bool> {
        self.has_tag(resource, CREATED_BY_TAG, CREATED_BY_VALUE).await
    }

    pub async fn is_isolated_hosting(&self, resource: &ResourceRef) -> Result<bool> {
        self.has_tag(resource, HOSTING_TAG, HOSTING_ISOLATED).await
    }
}

/// `Name` plus the provenance marker.
pub fn provenance_tags(name: &str) -> Tags {
    maplit::btreemap! {
        NAME_TAG.to_string() => name.to_string(),
        CREATED_BY_TAG.to_string() => CREATED_BY_VALUE.to_string(),
    }
}
