pub mod html;


use crate::config::SelectorConfig;
use crate::error::Result;
use scraper::Selector;

/// Compiled form of the site's markup contract
#[derive(Debug, Clone)]
pub struct Selectors {
    /// Headshot anchors on the full-cast page
    pub cast_link: Selector,
    /// Attribute holding the actor page path
    pub link_attr: String,
    /// Actor name header
    pub actor_name: Selector,
    /// Filmography credit links
    pub credit_title: Selector,
    /// Document base element
    pub base: Selector,
}

impl Selectors {
    /// Compile every selector in the configuration, failing on the first invalid one
    pub fn compile(config: &SelectorConfig) -> Result<Self> {
        Ok(Self {
            cast_link: html::compile(&config.cast_link)?,
            link_attr: config.link_attr.clone(),
            actor_name: html::compile(&config.actor_name)?,
            credit_title: html::compile(&config.credit_title)?,
            base: html::compile("base[href]")?,
        })
    }
}
