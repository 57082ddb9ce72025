//! Resolution of compiled contract artifacts.
//!
//! Artifacts are produced by the contract build pipeline (Hardhat or Foundry)
//! and looked up by contract name, optionally qualified with the source file
//! it was compiled from (`contracts/Will.sol:Will`).

use {
    crate::traits::ArtifactSource,
    alloy::{
        dyn_abi::{DynSolValue, JsonAbiExt, Specifier},
        json_abi::JsonAbi,
        primitives::{Bytes, U256},
    },
    serde::Deserialize,
    std::{
        collections::BTreeMap,
        fs,
        io,
        path::{Path, PathBuf},
    },
    thiserror::Error,
    walkdir::WalkDir,
};

/// Directory in the Hardhat artifacts folder that holds compiler inputs and
/// outputs rather than contract artifacts.
const BUILD_INFO_DIR: &str = "build-info";

#[derive(Debug, Error)]
pub enum Error {
    #[error("artifact for contract {name:?} not found in {}", root.display())]
    NotFound { name: String, root: PathBuf },
    #[error(
        "there are multiple artifacts for contract {name:?}, use a fully qualified name instead: \
         {candidates:?}"
    )]
    Ambiguous {
        name: String,
        candidates: Vec<PathBuf>,
    },
    #[error("failed to read artifact {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("artifact {} is malformed", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("artifact {} contains invalid bytecode", path.display())]
    InvalidBytecode {
        path: PathBuf,
        #[source]
        source: alloy::primitives::hex::FromHexError,
    },
    #[error("contract {0:?} is abstract and can't be deployed")]
    Abstract(String),
    #[error("contract {name:?} needs to be linked against libraries {libraries:?}")]
    UnlinkedLibraries {
        name: String,
        libraries: Vec<String>,
    },
    #[error("contract {name:?} expects {expected} constructor arguments but got {actual}")]
    ConstructorArity {
        name: String,
        expected: usize,
        actual: usize,
    },
    #[error("invalid value for constructor argument {index} of contract {name:?}")]
    ConstructorArgument {
        name: String,
        index: usize,
        #[source]
        source: alloy::dyn_abi::Error,
    },
    #[error("artifact lookup task failed")]
    Task(#[from] tokio::task::JoinError),
}

/// A compiled contract ready to be deployed.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub contract_name: String,
    pub source_name: Option<String>,
    pub abi: JsonAbi,
    /// Creation code without constructor arguments.
    pub bytecode: Bytes,
}

impl Artifact {
    /// Returns the creation code followed by the ABI encoded constructor
    /// arguments.
    ///
    /// Arguments are coerced into the parameter types the constructor
    /// declares, so the same integer works for `uint256`, `uint8` or `int32`
    /// parameters as long as it fits.
    pub fn deployment_code(&self, constructor_args: &[U256]) -> Result<Bytes, Error> {
        let Some(constructor) = &self.abi.constructor else {
            if !constructor_args.is_empty() {
                return Err(self.arity_error(0, constructor_args.len()));
            }
            return Ok(self.bytecode.clone());
        };
        if constructor.inputs.len() != constructor_args.len() {
            return Err(self.arity_error(constructor.inputs.len(), constructor_args.len()));
        }

        let values = constructor
            .inputs
            .iter()
            .zip(constructor_args)
            .enumerate()
            .map(|(index, (param, arg))| {
                param
                    .resolve()
                    .and_then(|ty| ty.coerce_str(&arg.to_string()))
                    .map_err(|source| Error::ConstructorArgument {
                        name: self.contract_name.clone(),
                        index,
                        source,
                    })
            })
            .collect::<Result<Vec<DynSolValue>, _>>()?;
        let encoded = constructor
            .abi_encode_input(&values)
            .map_err(|source| Error::ConstructorArgument {
                name: self.contract_name.clone(),
                index: 0,
                source,
            })?;

        let mut code = self.bytecode.to_vec();
        code.extend(encoded);
        Ok(code.into())
    }

    fn arity_error(&self, expected: usize, actual: usize) -> Error {
        Error::ConstructorArity {
            name: self.contract_name.clone(),
            expected,
            actual,
        }
    }
}

/// Looks up artifacts in a Hardhat style `artifacts` directory. Foundry's
/// `out` directory has the same `<Source>.sol/<Contract>.json` layout and
/// works as well.
#[derive(Debug, Clone)]
pub struct HardhatArtifacts {
    root: PathBuf,
}

impl HardhatArtifacts {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Blocking lookup and parsing of the artifact for `name`.
    pub fn load(&self, name: &str) -> Result<Artifact, Error> {
        let path = self.locate(name)?;
        let contents = fs::read_to_string(&path).map_err(|source| Error::Io {
            path: path.clone(),
            source,
        })?;
        let raw: RawArtifact =
            serde_json::from_str(&contents).map_err(|source| Error::Malformed {
                path: path.clone(),
                source,
            })?;
        raw.into_artifact(&path)
    }

    fn locate(&self, name: &str) -> Result<PathBuf, Error> {
        let not_found = || Error::NotFound {
            name: name.to_string(),
            root: self.root.clone(),
        };

        if let Some((source, contract)) = name.rsplit_once(':') {
            let path = self.root.join(source).join(format!("{contract}.json"));
            return if path.is_file() {
                Ok(path)
            } else {
                Err(not_found())
            };
        }

        let file_name = format!("{name}.json");
        let mut candidates = Vec::new();
        let entries = WalkDir::new(&self.root)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || entry.file_name() != BUILD_INFO_DIR);
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                // A missing artifacts directory just means nothing was compiled yet.
                Err(err) if err.depth() == 0 && is_not_found(&err) => break,
                Err(err) => {
                    return Err(Error::Io {
                        path: err.path().unwrap_or(&self.root).to_path_buf(),
                        source: err.into(),
                    });
                }
            };
            if entry.file_type().is_file() && entry.file_name() == file_name.as_str() {
                candidates.push(entry.into_path());
            }
        }
        candidates.sort();
        match candidates.len() {
            0 => Err(not_found()),
            1 => Ok(candidates.remove(0)),
            _ => Err(Error::Ambiguous {
                name: name.to_string(),
                candidates,
            }),
        }
    }
}

#[async_trait::async_trait]
impl ArtifactSource for HardhatArtifacts {
    async fn resolve(&self, contract_name: &str) -> Result<Artifact, Error> {
        let artifacts = self.clone();
        let name = contract_name.to_string();
        tokio::task::spawn_blocking(move || artifacts.load(&name)).await?
    }
}

fn is_not_found(err: &walkdir::Error) -> bool {
    err.io_error()
        .is_some_and(|err| err.kind() == io::ErrorKind::NotFound)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArtifact {
    contract_name: Option<String>,
    source_name: Option<String>,
    abi: JsonAbi,
    bytecode: RawBytecode,
    #[serde(default)]
    link_references: LinkReferences,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawBytecode {
    /// Hardhat stores the creation code as a plain hex string.
    Hex(String),
    /// Foundry stores it as an object next to its link references.
    Object {
        object: String,
        #[serde(default, rename = "linkReferences")]
        link_references: LinkReferences,
    },
}

/// Source file -> library name -> placeholder positions.
type LinkReferences = BTreeMap<String, BTreeMap<String, serde_json::Value>>;

impl RawArtifact {
    fn into_artifact(self, path: &Path) -> Result<Artifact, Error> {
        let contract_name = match self.contract_name {
            Some(name) => name,
            None => path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };
        let (code, link_references) = match self.bytecode {
            RawBytecode::Hex(code) => (code, self.link_references),
            RawBytecode::Object {
                object,
                link_references,
            } => (object, link_references),
        };

        if !link_references.is_empty() {
            let libraries = link_references
                .into_iter()
                .flat_map(|(source, libraries)| {
                    libraries
                        .into_keys()
                        .map(move |library| format!("{source}:{library}"))
                })
                .collect();
            return Err(Error::UnlinkedLibraries {
                name: contract_name,
                libraries,
            });
        }

        let bytecode: Bytes = alloy::primitives::hex::decode(code.trim())
            .map_err(|source| Error::InvalidBytecode {
                path: path.to_path_buf(),
                source,
            })?
            .into();
        if bytecode.is_empty() {
            return Err(Error::Abstract(contract_name));
        }

        Ok(Artifact {
            contract_name,
            source_name: self.source_name,
            abi: self.abi,
            bytecode,
        })
    }
}

#[cfg(test)]
mod tests {
    use {super::*, alloy::primitives::hex, serde_json::json, std::path::Path};

    const WILL_ABI: &str = r#"[
        {
            "inputs": [{ "internalType": "uint256", "name": "_amount", "type": "uint256" }],
            "stateMutability": "nonpayable",
            "type": "constructor"
        },
        {
            "inputs": [],
            "name": "amount",
            "outputs": [{ "internalType": "uint256", "name": "", "type": "uint256" }],
            "stateMutability": "view",
            "type": "function"
        }
    ]"#;

    fn write(root: &Path, relative: &str, value: serde_json::Value) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, serde_json::to_string_pretty(&value).unwrap()).unwrap();
    }

    fn hardhat_artifact(name: &str, source: &str, abi: &str, bytecode: &str) -> serde_json::Value {
        json!({
            "_format": "hh-sol-artifact-1",
            "contractName": name,
            "sourceName": source,
            "abi": serde_json::from_str::<serde_json::Value>(abi).unwrap(),
            "bytecode": bytecode,
            "deployedBytecode": "0x00",
            "linkReferences": {},
            "deployedLinkReferences": {}
        })
    }

    fn will_artifacts() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "contracts/Will.sol/Will.json",
            hardhat_artifact("Will", "contracts/Will.sol", WILL_ABI, "0x6080604052"),
        );
        write(
            dir.path(),
            "contracts/Will.sol/Will.dbg.json",
            json!({ "_format": "hh-sol-dbg-1", "buildInfo": "../../build-info/abc.json" }),
        );
        write(
            dir.path(),
            "build-info/Will.json",
            json!({ "id": "abc", "input": {}, "output": {} }),
        );
        dir
    }

    #[tokio::test]
    async fn resolves_by_name() {
        let dir = will_artifacts();
        let artifacts = HardhatArtifacts::new(dir.path().to_path_buf());

        let artifact = artifacts.resolve("Will").await.unwrap();
        assert_eq!(artifact.contract_name, "Will");
        assert_eq!(artifact.source_name.as_deref(), Some("contracts/Will.sol"));
        assert_eq!(artifact.bytecode, Bytes::from(hex!("6080604052")));
        assert_eq!(artifact.abi.constructor.as_ref().unwrap().inputs.len(), 1);
        assert!(artifact.abi.function("amount").is_some());
    }

    #[tokio::test]
    async fn resolves_fully_qualified_name() {
        let dir = will_artifacts();
        let artifacts = HardhatArtifacts::new(dir.path().to_path_buf());

        let artifact = artifacts.resolve("contracts/Will.sol:Will").await.unwrap();
        assert_eq!(artifact.contract_name, "Will");

        let err = artifacts.resolve("contracts/Other.sol:Will").await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn missing_artifact() {
        let dir = will_artifacts();
        let artifacts = HardhatArtifacts::new(dir.path().to_path_buf());
        let err = artifacts.resolve("Testament").await.unwrap_err();
        assert!(matches!(err, Error::NotFound { ref name, .. } if name == "Testament"));

        // Nothing compiled at all.
        let artifacts = HardhatArtifacts::new(dir.path().join("does-not-exist"));
        let err = artifacts.resolve("Will").await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn ambiguous_name() {
        let dir = will_artifacts();
        write(
            dir.path(),
            "contracts/legacy/Will.sol/Will.json",
            hardhat_artifact("Will", "contracts/legacy/Will.sol", "[]", "0x6080"),
        );
        let artifacts = HardhatArtifacts::new(dir.path().to_path_buf());

        let err = artifacts.resolve("Will").await.unwrap_err();
        let Error::Ambiguous { candidates, .. } = err else {
            panic!("unexpected error variant");
        };
        assert_eq!(candidates.len(), 2);

        let artifact = artifacts
            .resolve("contracts/legacy/Will.sol:Will")
            .await
            .unwrap();
        assert_eq!(artifact.bytecode, Bytes::from(hex!("6080")));
    }

    #[test]
    fn rejects_abstract_contract() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "contracts/IWill.sol/IWill.json",
            hardhat_artifact("IWill", "contracts/IWill.sol", "[]", "0x"),
        );
        let artifacts = HardhatArtifacts::new(dir.path().to_path_buf());
        assert!(matches!(artifacts.load("IWill"), Err(Error::Abstract(name)) if name == "IWill"));
    }

    #[test]
    fn rejects_unlinked_libraries() {
        let dir = tempfile::tempdir().unwrap();
        let mut artifact = hardhat_artifact(
            "Will",
            "contracts/Will.sol",
            WILL_ABI,
            "0x73__$d8b2a8a1ea6e8e4b5a01f1c2a3a40cfb6b$__6080",
        );
        artifact["linkReferences"] = json!({
            "contracts/Math.sol": { "Math": [{ "length": 20, "start": 1 }] }
        });
        write(dir.path(), "contracts/Will.sol/Will.json", artifact);
        let artifacts = HardhatArtifacts::new(dir.path().to_path_buf());

        let err = artifacts.load("Will").unwrap_err();
        let Error::UnlinkedLibraries { libraries, .. } = err else {
            panic!("unexpected error variant");
        };
        assert_eq!(libraries, vec!["contracts/Math.sol:Math".to_string()]);
    }

    #[test]
    fn rejects_malformed_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("contracts/Will.sol/Will.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{ not json").unwrap();
        let artifacts = HardhatArtifacts::new(dir.path().to_path_buf());
        assert!(matches!(artifacts.load("Will"), Err(Error::Malformed { .. })));
    }

    #[test]
    fn rejects_invalid_bytecode() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "contracts/Will.sol/Will.json",
            hardhat_artifact("Will", "contracts/Will.sol", WILL_ABI, "0x60zz"),
        );
        let artifacts = HardhatArtifacts::new(dir.path().to_path_buf());
        assert!(matches!(
            artifacts.load("Will"),
            Err(Error::InvalidBytecode { .. })
        ));
    }

    #[test]
    fn only_counts_artifact_files_outside_build_info() {
        let dir = will_artifacts();
        // Directories that happen to carry the artifact's file name.
        fs::create_dir_all(dir.path().join("cache/Will.json")).unwrap();
        fs::create_dir_all(dir.path().join("build-info/nested/Will.json")).unwrap();
        write(
            dir.path(),
            "build-info/nested/Will.sol/Will.json",
            hardhat_artifact("Will", "contracts/Will.sol", WILL_ABI, "0x6080"),
        );
        let artifacts = HardhatArtifacts::new(dir.path().to_path_buf());

        let artifact = artifacts.load("Will").unwrap();
        assert_eq!(artifact.bytecode, Bytes::from(hex!("6080604052")));
    }

    #[test]
    fn reads_foundry_layout() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "Will.sol/Will.json",
            json!({
                "abi": serde_json::from_str::<serde_json::Value>(WILL_ABI).unwrap(),
                "bytecode": { "object": "0x6080604052", "linkReferences": {} },
                "deployedBytecode": { "object": "0x00", "linkReferences": {} }
            }),
        );
        let artifacts = HardhatArtifacts::new(dir.path().to_path_buf());

        let artifact = artifacts.load("Will").unwrap();
        assert_eq!(artifact.contract_name, "Will");
        assert_eq!(artifact.source_name, None);
        assert_eq!(artifact.bytecode, Bytes::from(hex!("6080604052")));
    }

    fn artifact_with_abi(abi: &str) -> Artifact {
        Artifact {
            contract_name: "Will".to_string(),
            source_name: None,
            abi: serde_json::from_str(abi).unwrap(),
            bytecode: Bytes::from(hex!("6080604052")),
        }
    }

    #[test]
    fn encodes_constructor_argument() {
        let artifact = artifact_with_abi(WILL_ABI);
        let code = artifact.deployment_code(&[U256::from(100)]).unwrap();
        assert_eq!(
            code,
            Bytes::from(hex!(
                "6080604052"
                "0000000000000000000000000000000000000000000000000000000000000064"
            ))
        );
    }

    #[test]
    fn coerces_into_narrower_integer_types() {
        let abi = r#"[{
            "inputs": [{ "name": "_amount", "type": "uint8" }],
            "stateMutability": "nonpayable",
            "type": "constructor"
        }]"#;
        let artifact = artifact_with_abi(abi);
        let code = artifact.deployment_code(&[U256::from(100)]).unwrap();
        assert_eq!(code.len(), 5 + 32);
        assert_eq!(code[code.len() - 1], 100);

        assert!(matches!(
            artifact.deployment_code(&[U256::from(256)]),
            Err(Error::ConstructorArgument { index: 0, .. })
        ));
    }

    #[test]
    fn rejects_non_integral_parameter() {
        let abi = r#"[{
            "inputs": [{ "name": "heir", "type": "address" }],
            "stateMutability": "nonpayable",
            "type": "constructor"
        }]"#;
        let artifact = artifact_with_abi(abi);
        assert!(matches!(
            artifact.deployment_code(&[U256::from(100)]),
            Err(Error::ConstructorArgument { .. })
        ));
    }

    #[test]
    fn checks_constructor_arity() {
        let artifact = artifact_with_abi(WILL_ABI);
        assert!(matches!(
            artifact.deployment_code(&[]),
            Err(Error::ConstructorArity {
                expected: 1,
                actual: 0,
                ..
            })
        ));

        let artifact = artifact_with_abi("[]");
        assert!(matches!(
            artifact.deployment_code(&[U256::from(100)]),
            Err(Error::ConstructorArity {
                expected: 0,
                actual: 1,
                ..
            })
        ));
        assert_eq!(
            artifact.deployment_code(&[]).unwrap(),
            Bytes::from(hex!("6080604052"))
        );
    }
}
