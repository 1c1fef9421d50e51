//! Fixed files shipped in every installer bundle
//!
//! Script contents are part of the bundle format and must not change.
//! The upload script goes through a template compiled once per process.

use minijinja::{Environment, UndefinedBehavior, context};
use once_cell::sync::Lazy;

use crate::error::{InstallerError, Result};

pub const INSTALL_SCRIPT_FILE: &str = "install";
pub const UPLOAD_SCRIPT_FILE: &str = "upload";
pub const UPGRADE_SCRIPT_FILE: &str = "upgrade";
pub const CHECK_SCRIPT_FILE: &str = "run_preflight_checks";
pub const README_FILE: &str = "README";

/// Name of the cluster binary inside installers
pub const GRAVITY_BINARY_FILE: &str = "gravity";

pub const INSTALL_SCRIPT: &str = r##"#!/bin/sh
#
# Installation script for Gravity-powered multi-host Linux applications.
#
# Copyright 2016 Gravitational, Inc.
#
# This file is licensed under the Apache License, Version 2.0
# (the "License"); you may not use this file except in compliance
# with the License.  You may obtain a copy of the License at
#
#    http://www.apache.org/licenses/LICENSE-2.0

REQMSG="This installer requires a 64-bit Linux desktop"

# The entry point
main() {
    case $(uname) in
        "Linux")
            arch=$(uname -m)
            if [ $arch = "x86_64" ]; then
                launchInstaller "$@"
            fi
            ;;
        "Darwin") osxError
            ;;
    esac
    echo $REQMSG
    exit 1
}

# shows a graphical UI popup to OSX users who click on this
# file in Finder
osxError() {
  osascript <<EOM
    tell app "System Events"
      display dialog "$REQMSG" buttons {"OK"} default button 1 with icon caution with title "Installer"
      return  -- Suppress result
    end tell
EOM
  exit 1
}

launchInstaller() {
    # make the directory of the script current
    # and launch the install wizard:
    cd $(dirname $0) && ./gravity wizard "$@"
    exit 0
}

main "$@"
"##;

pub const UPGRADE_SCRIPT: &str = r##"#!/bin/bash
#
# Script for upgrading the currently running application to a new version.
#
# Copyright 2016 Gravitational, Inc.
#
# This file is licensed under the Apache License, Version 2.0
# (the "License"); you may not use this file except in compliance
# with the License.  You may obtain a copy of the License at
#
#    http://www.apache.org/licenses/LICENSE-2.0

if [[ $(id -u) -ne 0 ]]; then
  echo "please run this script as root" && exit 1
fi

scriptdir=$(dirname $(realpath $0))
app=$("$scriptdir/gravity" app-package --state-dir="$scriptdir")
"$scriptdir/upload" && "$scriptdir/gravity" --insecure upgrade $app "$@"
"##;

pub const CHECK_SCRIPT: &str = r##"#!/bin/bash
#
# Script for executing preflight checks.
#
# Copyright 2019 Gravitational, Inc.
#
# This file is licensed under the Apache License, Version 2.0
# (the "License"); you may not use this file except in compliance
# with the License.  You may obtain a copy of the License at
#
#    http://www.apache.org/licenses/LICENSE-2.0

scriptdir=$(dirname $(realpath $0))
"$scriptdir/gravity" check --image-path="$scriptdir" "$scriptdir/app.yaml" "$@"
"##;

pub const README: &str = r##"Requirements
============

To launch the installer you need a 64-bit Linux desktop computer
with a web browser such as Firefox or Chrome.

You also need a direct network connection to the servers
("target servers") you are installing the application to.

The target servers need to be able to connect to the computer
the installer is running on during the installation.

Executing preflight checks
==========================

Before launching install or upgrade operation, you can execute preflight
checks to make sure the infrastructure satisfies all requirements.

For example, to see if the node satisfies requirements before initial
installation, run:

./run_preflight_checks

To check the node against a specific node profile (defined in app.yaml found
in the same directory), pass the profile name on the command line:

./run_preflight_checks --profile=worker

If the cluster is already installed, the same script can be used to check
requirements before launching the upgrade operation:

./run_preflight_checks

Starting the installer
======================

To install the application simply type in your terminal:

./install

...this should open a browser with the installer Web UI running
on localhost.

Upgrading the installed application
===================================

There are two ways to upgrade the currently running application to a new
from this tarball.

You can launch:

./upload

to upload the application update package to locally running site
and then launch the update operation from UI.

Or launch:

./upgrade

which will upload the new application version to locally running site
and start the upgrade procedure.

The upgrade operation progress can be monitored via UI or using gravity
status command.
"##;

const UPLOAD_SCRIPT_TEMPLATE: &str = r##"#!/bin/bash
#
# Script for uploading new application version to installed site.
#
# Copyright 2016 Gravitational, Inc.
#
# This file is licensed under the Apache License, Version 2.0
# (the "License"); you may not use this file except in compliance
# with the License.  You may obtain a copy of the License at
#
#    http://www.apache.org/licenses/LICENSE-2.0

SCRIPTDIR="$( cd "$(dirname "$0")" ; pwd -P )"
"$SCRIPTDIR/gravity" --insecure update upload --data-dir="$SCRIPTDIR"
"##;

static SCRIPTS: Lazy<std::result::Result<Environment<'static>, String>> = Lazy::new(|| {
    let mut env = Environment::new();
    env.set_keep_trailing_newline(true);
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.add_template(UPLOAD_SCRIPT_FILE, UPLOAD_SCRIPT_TEMPLATE)
        .map_err(|e| e.to_string())?;
    Ok(env)
});

/// Render the upload script
pub fn render_upload_script() -> Result<String> {
    let script_error = |message: String| InstallerError::Script {
        name: UPLOAD_SCRIPT_FILE.to_string(),
        message,
    };

    let env = SCRIPTS.as_ref().map_err(|e| script_error(e.clone()))?;
    env.get_template(UPLOAD_SCRIPT_FILE)
        .and_then(|tmpl| tmpl.render(context! {}))
        .map_err(|e| script_error(e.to_string()))
}
