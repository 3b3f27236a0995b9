//! Prints the Polkadot CRD manifest as YAML.
//!
//! ```bash
//! cargo run -p crds --bin crdgen > config/crd/polkadot.yaml
//! ```

use anyhow::Result;
use crds::Polkadot;
use kube::CustomResourceExt;

fn main() -> Result<()> {
    let crd = Polkadot::crd();
    print!("{}", serde_yaml::to_string(&crd)?);
    Ok(())
}
