//! Built-in SQLite plugins.

pub mod android_twitter;
pub mod android_webview;
pub mod google_callscreen;

use std::sync::Arc;

use crate::plugin::SqlitePlugin;

pub use android_twitter::TwitterAndroidPlugin;
pub use android_webview::AndroidWebViewPlugin;
pub use google_callscreen::GoogleCallScreenPlugin;

/// Every built-in plugin, in registration order.
pub fn builtin() -> Vec<Arc<dyn SqlitePlugin>> {
    vec![
        Arc::new(GoogleCallScreenPlugin::new()),
        Arc::new(AndroidWebViewPlugin::new()),
        Arc::new(TwitterAndroidPlugin::new()),
    ]
}
