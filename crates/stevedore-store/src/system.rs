//! Well-known system packages
//!
//! Cluster installers may carry a certificate authority and a trusted
//! cluster descriptor. Both live at fixed locators in the system repository.

use std::io::{Cursor, Read};
use std::path::Path;
use stevedore_core::archive::{SHARED_READ_MASK, extract_archive, read_file_from_archive};
use stevedore_core::{Item, Locator, PackageEnvelope, TrustedCluster, write_items};

use crate::error::Result;
use crate::packages::{PackageOptions, PackageService};

/// File holding the certificate inside the certificate authority package
pub const CA_CERT_FILE: &str = "ca.cert";

/// Store a certificate authority package holding `cert_pem`
pub fn create_certificate_authority(
    packages: &dyn PackageService,
    cert_pem: &str,
) -> Result<PackageEnvelope> {
    let locator = Locator::certificate_authority();
    packages.upsert_repository(&locator.repository, None)?;

    let mut data = Vec::new();
    write_items(
        &mut data,
        vec![Item::from_string_mode(CA_CERT_FILE, cert_pem, SHARED_READ_MASK)],
    )?;

    packages.create_package(&locator, &mut Cursor::new(data), PackageOptions::default())
}

/// Read the certificate stored in the certificate authority package
pub fn read_certificate_authority(packages: &dyn PackageService) -> Result<String> {
    let (_, reader) = packages.read_package(&Locator::certificate_authority())?;
    let data = read_file_from_archive(reader, CA_CERT_FILE)?;
    Ok(String::from_utf8_lossy(&data).into_owned())
}

/// Store a trusted cluster package
///
/// The descriptor is stored as given; callers decide the enabled state.
pub fn create_trusted_cluster(
    packages: &dyn PackageService,
    cluster: &TrustedCluster,
) -> Result<PackageEnvelope> {
    let locator = Locator::trusted_cluster();
    packages.upsert_repository(&locator.repository, None)?;

    let data = cluster.to_json()?;
    packages.create_package(&locator, &mut Cursor::new(data), PackageOptions::default())
}

/// Read the trusted cluster descriptor from its package
pub fn read_trusted_cluster(packages: &dyn PackageService) -> Result<TrustedCluster> {
    let (_, mut reader) = packages.read_package(&Locator::trusted_cluster())?;
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    Ok(TrustedCluster::from_json(&data)?)
}

/// Extract a tar.gz package into `dir`
pub fn unpack(packages: &dyn PackageService, locator: &Locator, dir: &Path) -> Result<()> {
    let (_, reader) = packages.read_package(locator)?;
    extract_archive(reader, dir)?;
    Ok(())
}
