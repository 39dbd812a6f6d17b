// cms.rs - Supported CMS profiles
// Purpose: Static description of each CMS: where plugins and themes live, which paths
//          identify an installation, and which files disclose too much

use crate::detect::DetectionPaths;
use crate::interesting::InterestingUrl;
use clap::ValueEnum;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Cms {
    Drupal,
    Silverstripe,
}

pub struct CmsProfile {
    pub name: &'static str,
    pub plugins_file: &'static str,
    pub plugins_base_url: &'static [&'static str],
    pub themes_file: &'static str,
    pub themes_base_url: &'static [&'static str],
    pub folder_url: &'static str,
    pub regular_file_url: &'static [&'static str],
    pub not_found_url: &'static str,
    pub module_readme_file: &'static str,
    pub interesting_urls: &'static [(&'static str, &'static str)],
    pub versions_file: &'static str,
}

static DRUPAL: CmsProfile = CmsProfile {
    name: "drupal",
    plugins_file: "data/drupal/plugins.txt",
    plugins_base_url: &["%ssites/all/modules/%s/", "%ssites/default/modules/%s/"],
    themes_file: "data/drupal/themes.txt",
    themes_base_url: &["%ssites/all/themes/%s/", "%ssites/default/themes/%s/"],
    folder_url: "misc/",
    regular_file_url: &["misc/drupal.js", "core/misc/drupal.js"],
    not_found_url: "misc/test/error/404/ispresent.html",
    module_readme_file: "README.txt",
    interesting_urls: &[
        ("CHANGELOG.txt", "Default changelog file"),
        ("user/login", "Default admin"),
    ],
    versions_file: "data/drupal/versions.xml",
};

static SILVERSTRIPE: CmsProfile = CmsProfile {
    name: "silverstripe",
    plugins_file: "data/silverstripe/plugins.txt",
    plugins_base_url: &["%s%s/"],
    themes_file: "data/silverstripe/themes.txt",
    themes_base_url: &["%sthemes/%s/"],
    folder_url: "framework/",
    regular_file_url: &[
        "cms/css/layout.css",
        "framework/css/UploadField.css",
        "framework/CONTRIBUTING.md",
    ],
    not_found_url: "framework/test/error/404/ispresent.html",
    module_readme_file: "README.md",
    interesting_urls: &[
        ("framework/docs/en/changelogs/index.md", "Changelogs index"),
        ("framework/composer.json", "Framework version information"),
        ("cms/composer.json", "CMS version information"),
        ("Security/login", "Default admin"),
    ],
    versions_file: "data/silverstripe/versions.xml",
};

impl Cms {
    pub fn profile(self) -> &'static CmsProfile {
        match self {
            Cms::Drupal => &DRUPAL,
            Cms::Silverstripe => &SILVERSTRIPE,
        }
    }
}

impl fmt::Display for Cms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.profile().name)
    }
}

impl CmsProfile {
    pub fn detection_paths(&self) -> DetectionPaths {
        DetectionPaths {
            cms: self.name.to_string(),
            folder_url: self.folder_url.to_string(),
            regular_file_urls: self.regular_file_url.iter().map(|u| u.to_string()).collect(),
            not_found_url: self.not_found_url.to_string(),
        }
    }

    pub fn interesting(&self) -> Vec<InterestingUrl> {
        self.interesting_urls
            .iter()
            .map(|(path, description)| InterestingUrl::new(path, description))
            .collect()
    }

    pub fn default_plugins_base_url(&self) -> Vec<String> {
        self.plugins_base_url.iter().map(|t| t.to_string()).collect()
    }

    pub fn default_themes_base_url(&self) -> Vec<String> {
        self.themes_base_url.iter().map(|t| t.to_string()).collect()
    }
}
