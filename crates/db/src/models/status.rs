//! Enumerations for the text-valued, CHECK-constrained columns of
//! `library.ill_requests`.
//!
//! Each enum's `as_str()` value matches the text stored in the database and
//! enforced by the column's CHECK constraint. The workflow `status` and the
//! `sync_status` are independent axes over the same row; nothing here (or in
//! the database) restricts transitions within either axis.

use serde::{Deserialize, Serialize};

macro_rules! define_text_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Return the database text value.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( Self::$variant => $text ),+
                }
            }

            /// Parse a database text value. Returns `None` for anything not
            /// in the enumeration (e.g. drift from manual edits).
            pub fn parse(value: &str) -> Option<Self> {
                match value {
                    $( $text => Some(Self::$variant), )+
                    _ => None,
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

define_text_enum! {
    /// Direction of the interlibrary loan: we borrow from another library,
    /// or lend to one. Immutable after creation.
    RequestType {
        Borrow => "borrow",
        Lend => "lend",
    }
}

define_text_enum! {
    /// Workflow status of a request.
    RequestStatus {
        New => "new",
        Requested => "requested",
        InTransit => "in_transit",
        Received => "received",
        Completed => "completed",
        Canceled => "canceled",
    }
}

define_text_enum! {
    /// Handling priority. Does not affect workflow transitions.
    Priority {
        Low => "low",
        Normal => "normal",
        High => "high",
    }
}

define_text_enum! {
    /// Synchronization state against the external ILL provider network.
    SyncStatus {
        Manual => "manual",
        Pending => "pending",
        Synced => "synced",
        Failed => "failed",
    }
}
