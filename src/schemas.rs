//! Shapes of the persisted entities, used to validate request bodies.

use crate::validation::{FieldKind, FieldSpec, Schema};

pub const UPDATE_STATUS: &[&str] = &["IN_PROGRESS", "LIVE", "DEPRECATED", "ARCHIVED"];

const TEXT: FieldKind = FieldKind::Text { min_len: 0 };
const NON_EMPTY: FieldKind = FieldKind::Text { min_len: 1 };

pub static USER: Schema = Schema {
    name: "User",
    fields: &[
        FieldSpec::new("id", FieldKind::Uuid),
        FieldSpec::new("username", TEXT),
        FieldSpec::new("password", TEXT),
    ],
};

pub static PRODUCT: Schema = Schema {
    name: "Product",
    fields: &[
        FieldSpec::new("id", FieldKind::Uuid),
        FieldSpec::new("createdAt", FieldKind::DateTime),
        FieldSpec::new("name", TEXT),
        FieldSpec::new("belongsToId", TEXT),
    ],
};

pub static UPDATE: Schema = Schema {
    name: "Update",
    fields: &[
        FieldSpec::new("status", FieldKind::Enum(UPDATE_STATUS)),
        FieldSpec::new("id", FieldKind::Uuid),
        FieldSpec::new("createdAt", FieldKind::DateTime),
        FieldSpec::new("updatedAt", FieldKind::DateTime),
        FieldSpec::new("title", NON_EMPTY),
        FieldSpec::new("body", TEXT),
        FieldSpec::new("version", TEXT).nullable(),
        FieldSpec::new("asset", TEXT),
        FieldSpec::new("productId", TEXT),
    ],
};

pub static UPDATE_POINT: Schema = Schema {
    name: "UpdatePoint",
    fields: &[
        FieldSpec::new("id", FieldKind::Uuid),
        FieldSpec::new("createdAt", FieldKind::DateTime),
        FieldSpec::new("updatedAt", FieldKind::DateTime),
        FieldSpec::new("name", TEXT),
        FieldSpec::new("description", TEXT),
        FieldSpec::new("updateId", TEXT),
    ],
};
