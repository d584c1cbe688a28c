//! Which portal screen a location shows.

use crate::navigation::{Location, NavigateTo};

/// Developer portal tabs, by their `tab` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tab {
    ApiKeys,
    Webhooks,
    Transactions,
}

impl Tab {
    pub const ALL: [Tab; 3] = [Tab::ApiKeys, Tab::Webhooks, Tab::Transactions];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tab::ApiKeys => "api-keys",
            Tab::Webhooks => "webhooks",
            Tab::Transactions => "transactions",
        }
    }

    pub fn parse(s: &str) -> Option<Tab> {
        Tab::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

/// Modal dialogs, by their `dialog` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialog {
    CreateApiKey,
    CreateWebhook,
    /// One-time display of a freshly created secret.
    SecretModal,
}

impl Dialog {
    pub const ALL: [Dialog; 3] = [Dialog::CreateApiKey, Dialog::CreateWebhook, Dialog::SecretModal];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dialog::CreateApiKey => "create-api-key",
            Dialog::CreateWebhook => "create-webhook",
            Dialog::SecretModal => "secret_modal",
        }
    }

    pub fn parse(s: &str) -> Option<Dialog> {
        Dialog::ALL.into_iter().find(|d| d.as_str() == s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Login,
    DevPortal { tab: Tab, dialog: Option<Dialog> },
}

/// A view plus the navigation needed to make the URL canonical, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub view: View,
    pub redirect: Option<NavigateTo>,
}

impl View {
    /// Signed-out users always see the login screen. Signed-in users see the
    /// developer portal; a URL that does not name `nav=dev-portal` and a known
    /// tab is replaced by the API keys tab.
    pub fn resolve(location: &Location, signed_in: bool) -> Resolved {
        if !signed_in {
            return Resolved {
                view: View::Login,
                redirect: None,
            };
        }

        let dialog = location.param("dialog").as_deref().and_then(Dialog::parse);
        let tab = location.param("tab").as_deref().and_then(Tab::parse);
        match (location.param("nav").as_deref(), tab) {
            (Some("dev-portal"), Some(tab)) => Resolved {
                view: View::DevPortal { tab, dialog },
                redirect: None,
            },
            _ => Resolved {
                view: View::DevPortal {
                    tab: Tab::ApiKeys,
                    dialog,
                },
                redirect: Some(
                    NavigateTo::new()
                        .param("nav", "dev-portal")
                        .param("tab", Tab::ApiKeys.as_str())
                        .replace(),
                ),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(href: &str) -> Location {
        Location::parse(href).unwrap()
    }

    #[test]
    fn signed_out_sees_login() {
        let r = View::resolve(&at("https://portal.test/?nav=dev-portal&tab=webhooks"), false);
        assert_eq!(r.view, View::Login);
        assert!(r.redirect.is_none());
    }

    #[test]
    fn canonical_url_is_kept() {
        let r = View::resolve(
            &at("https://portal.test/?nav=dev-portal&tab=webhooks&dialog=create-webhook"),
            true,
        );
        assert_eq!(
            r.view,
            View::DevPortal {
                tab: Tab::Webhooks,
                dialog: Some(Dialog::CreateWebhook)
            }
        );
        assert!(r.redirect.is_none());
    }

    #[test]
    fn missing_or_unknown_tab_redirects() {
        for href in [
            "https://portal.test/",
            "https://portal.test/?nav=login",
            "https://portal.test/?nav=dev-portal&tab=billing",
        ] {
            let r = View::resolve(&at(href), true);
            let redirect = r.redirect.expect(href);
            assert!(redirect.replace);
            assert_eq!(
                redirect.params.unwrap()[1],
                ("tab".to_string(), "api-keys".into())
            );
        }
    }
}
