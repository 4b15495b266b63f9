//! Unit tests mirroring the `src/` layout, one file per source module


/// CiliaQ files and bundles shared by the unit tests
// Not every test module uses every fixture
#[allow(dead_code)]
pub mod fixtures {
    use cilia_curate::ciliaq::document::CiliaQDocument;
    use cilia_curate::io::configuration::CurationConfig;
    use cilia_curate::session::discovery::Bundle;
    use std::fs;
    use std::path::{Path, PathBuf};

    /// Result file text with one row per id, calibration 0.5 um per pixel
    pub fn cq_text(ids: &[&str]) -> String {
        let mut text = String::from(
            "Settings:\n\
             \tImage name\tsample.tif\n\
             \tCalibration [um/px]\t0.5\n\
             \tChannel\t2\n\
             \n\
             History:\n\
             \x20   01/02/2025 @ 10:00: analysed\n\
             \n\
             Results:\n\
             \tImage\tID\tx center [um]\ty center [um]\tLength [um]\n",
        );
        for (index, id) in ids.iter().enumerate() {
            let position = (index + 1) * 10;
            text.push_str(&format!(
                "\tsample.tif\t{id}\t{position}.0\t{position}.5\t3.{index}\n"
            ));
        }
        text
    }

    /// Write `cq_text(ids)` to `dir/name`
    pub fn write_cq(dir: &Path, name: &str, ids: &[&str]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, cq_text(ids)).unwrap();
        path
    }

    /// Write and load a result file
    pub fn load_cq(dir: &Path, name: &str, ids: &[&str]) -> CiliaQDocument {
        CiliaQDocument::load(&write_cq(dir, name, ids)).unwrap()
    }

    /// Bundle without a crop image
    pub fn bundle(dir: &Path, id: usize, name: &str, ids: &[&str]) -> Bundle {
        let path = write_cq(dir, name, ids);
        let document = CiliaQDocument::load(&path).unwrap();
        Bundle::new(id, path, None, document)
    }

    /// Ids `1..=count` as strings
    pub fn ids(count: usize) -> Vec<String> {
        (1..=count).map(|id| id.to_string()).collect()
    }

    /// Borrow a list of owned ids
    pub fn refs(ids: &[String]) -> Vec<&str> {
        ids.iter().map(String::as_str).collect()
    }

    /// Write a 16-bit ImageJ hyperstack, `pages` in file order
    pub fn write_stack(path: &Path, width: u32, height: u32, channels: usize, pages: &[Vec<u16>]) {
        use tiff::encoder::{TiffEncoder, colortype::Gray16};
        use tiff::tags::Tag;

        let description = format!(
            "ImageJ=1.54f\nimages={}\nchannels={channels}\nslices={}\nhyperstack=true\n",
            pages.len(),
            pages.len() / channels.max(1)
        );
        let mut encoder = TiffEncoder::new(fs::File::create(path).unwrap()).unwrap();
        for (index, page) in pages.iter().enumerate() {
            let mut image = encoder.new_image::<Gray16>(width, height).unwrap();
            if index == 0 {
                image
                    .encoder()
                    .write_tag(Tag::ImageDescription, description.as_str())
                    .unwrap();
            }
            image.write_data(page).unwrap();
        }
    }

    /// Defaults with everything in one session
    pub fn single_session_config() -> CurationConfig {
        CurationConfig {
            roi_per_session: 0,
            ..CurationConfig::default()
        }
    }
}
