//! FITS image I/O (spec §6).
//!
//! Kept deliberately narrow: single-HDU, single-plane image read/write, plus
//! a header copy from a reference file so output products carry the same
//! WCS/instrument keywords as the frame they were registered against. No
//! table HDUs, no multi-extension files.

use std::path::Path;

use fitsio::hdu::HduInfo;
use fitsio::images::{ImageDescription, ImageType};
use fitsio::FitsFile;

use crate::error::{Result, StarStackError};
use crate::image::Image;

/// The cfitsio "keyword not found" status code, used to tell a genuinely
/// absent header card apart from a read failure.
const KEY_NO_EXIST: i32 = 202;

/// WCS and instrument keywords worth carrying from the reference frame's
/// header onto a stacked output; the structural keywords (`SIMPLE`,
/// `BITPIX`, `NAXIS*`, `EXTEND`) are derived by cfitsio from `image` itself
/// and are deliberately not in this list.
const COPIED_HEADER_KEYS: &[&str] = &[
    "CTYPE1", "CTYPE2", "CRVAL1", "CRVAL2", "CRPIX1", "CRPIX2", "CDELT1", "CDELT2", "CD1_1",
    "CD1_2", "CD2_1", "CD2_2", "CUNIT1", "CUNIT2", "EQUINOX", "RADESYS", "LONPOLE", "LATPOLE",
    "OBJECT", "TELESCOP", "INSTRUME", "OBSERVER", "DATE-OBS", "EXPTIME", "FILTER",
];

/// Read `keyword` from `hdu`'s header as a string, the same
/// `read_key::<String>` idiom `mwalib`'s `fits_read.rs` uses to pull out a
/// raw card value before parsing it further. Returns `Ok(None)` when the
/// card is absent rather than erroring, since most reference headers won't
/// carry every key in [`COPIED_HEADER_KEYS`].
fn read_key_if_present(
    fptr: &mut FitsFile,
    hdu: &fitsio::hdu::FitsHdu,
    keyword: &str,
) -> Result<Option<String>> {
    match hdu.read_key::<String>(fptr, keyword) {
        Ok(value) => Ok(Some(value)),
        Err(fitsio::errors::Error::Fits(fe)) if fe.status == KEY_NO_EXIST => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Read the primary HDU of `path` as a 2-D `f64` image.
pub fn read_image(path: impl AsRef<Path>) -> Result<Image> {
    let mut fptr = FitsFile::open(path.as_ref())?;
    let hdu = fptr.primary_hdu()?;

    let shape = match &hdu.info {
        HduInfo::ImageInfo { shape, .. } => shape.clone(),
        _ => {
            return Err(StarStackError::Format(format!(
                "{}: primary HDU is not an image",
                path.as_ref().display()
            )))
        }
    };
    if shape.len() != 2 {
        return Err(StarStackError::Format(format!(
            "{}: expected a 2-D image, found {} axes",
            path.as_ref().display(),
            shape.len()
        )));
    }
    let (rows, cols) = (shape[0], shape[1]);

    let data: Vec<f64> = hdu.read_image(&mut fptr)?;
    Image::from_shape_vec((rows, cols), data).map_err(|e| StarStackError::Format(e.to_string()))
}

/// Write `image` to a new FITS file at `path` with no header beyond what
/// cfitsio derives from the data itself. Used for diagnostic dumps, where
/// there's no reference frame whose header would make sense to carry over.
pub fn write_image(path: impl AsRef<Path>, image: &Image) -> Result<()> {
    let (rows, cols) = image.dim();
    let description = ImageDescription {
        data_type: ImageType::Double,
        dimensions: &[rows, cols],
    };
    let mut fptr = FitsFile::create(path.as_ref()).open()?;
    let hdu = fptr.create_image("PRIMARY".to_string(), &description)?;
    let contiguous: Vec<f64> = image.iter().copied().collect();
    hdu.write_image(&mut fptr, &contiguous)?;
    Ok(())
}

/// Write `image` to a new FITS file at `path`, copying the WCS/instrument
/// header cards in [`COPIED_HEADER_KEYS`] from `reference`'s primary HDU.
/// Cards absent from the reference are skipped; a card present but
/// unwritable is a real I/O failure and aborts the write.
pub fn write_image_like_reference(
    path: impl AsRef<Path>,
    image: &Image,
    reference: impl AsRef<Path>,
) -> Result<()> {
    let mut ref_fptr = FitsFile::open(reference.as_ref())?;
    let ref_hdu = ref_fptr.primary_hdu()?;

    let (rows, cols) = image.dim();
    let description = ImageDescription {
        data_type: ImageType::Double,
        dimensions: &[rows, cols],
    };

    let mut fptr = FitsFile::create(path.as_ref()).open()?;
    let hdu = fptr.create_image("PRIMARY".to_string(), &description)?;

    for &key in COPIED_HEADER_KEYS {
        if let Some(value) = read_key_if_present(&mut ref_fptr, &ref_hdu, key)? {
            hdu.write_key(&mut fptr, key, value)?;
        }
    }

    let contiguous: Vec<f64> = image.iter().copied().collect();
    hdu.write_image(&mut fptr, &contiguous)?;
    Ok(())
}
