//! End-to-end: a staging tree with persisted provisioning state in, a
//! grouped host inventory out.

use std::fs;

use common::inventory::build_inventory;
use common::state::{parse_state, STATE_FILENAME};

const STATE_JSON: &str = r#"{
    "modules": [
        {
            "resources": {
                "aws_instance.web.0": {
                    "type": "aws_instance",
                    "primary": {
                        "attributes": {
                            "id": "i-0001",
                            "ami": "ami-2e623239",
                            "availability_zone": "us-east-1b",
                            "subnet_id": "subnet-b8214792",
                            "private_ip": "10.0.0.5",
                            "public_ip": "54.0.0.5",
                            "tags.Name": "web-1",
                            "tags.Cluster": "web"
                        }
                    }
                },
                "aws_instance.web.1": {
                    "type": "aws_instance",
                    "primary": {
                        "attributes": {
                            "id": "i-0002",
                            "ami": "ami-2e623239",
                            "availability_zone": "us-east-1c",
                            "subnet_id": "subnet-b8214792",
                            "private_ip": "10.0.0.6",
                            "public_ip": "54.0.0.6",
                            "tags.Name": "web-2",
                            "tags.Cluster": "web"
                        }
                    }
                }
            },
            "outputs": {
                "web_ips": {
                    "value": ["10.0.0.5", "10.0.0.6"]
                }
            }
        }
    ]
}"#;

#[test]
fn state_document_to_inventory_document() {
    let staging = tempfile::tempdir().unwrap();
    let env_dir = staging.path().join("web_devtest");
    fs::create_dir(&env_dir).unwrap();
    fs::write(env_dir.join(STATE_FILENAME), STATE_JSON).unwrap();

    let model = parse_state(staging.path()).unwrap();
    let inventory = build_inventory(&model, true);

    // Both hosts exist with their private addresses selected.
    assert_eq!(inventory.hosts["web-1"].ansible_ssh_host, "10.0.0.5");
    assert_eq!(inventory.hosts["web-2"].ansible_ssh_host, "10.0.0.6");

    // The shared tag group was created by web-1 (which is not appended)
    // and web-2 was appended afterwards.
    assert_eq!(inventory.groups["tags.Cluster=web"].hosts, vec!["web-2"]);

    // The declared output forms a group matching both connect addresses.
    let web_ips = &inventory.groups["web_ips"];
    assert_eq!(web_ips.hosts, vec!["web-1", "web-2"]);
    assert_eq!(
        web_ips.vars.as_ref().unwrap().ipaddrs,
        vec!["10.0.0.5", "10.0.0.6"]
    );

    // And the external document shape holds.
    let document = inventory.to_json().unwrap();
    assert_eq!(
        document["_meta"]["hostvars"]["web-1"]["availability_zone"],
        "us-east-1b"
    );
    assert_eq!(document["web_ips"]["hosts"][1], "web-2");
}
